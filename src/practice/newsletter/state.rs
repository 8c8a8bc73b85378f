//! Newsletter run state

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::practice::workflow::state::{ReducerType, StateSchema};

pub const KEYWORD: &str = "keyword";
pub const LANGUAGE: &str = "language";
pub const ARTICLE_TITLES: &str = "article_titles";
pub const NEWSLETTER_THEME: &str = "newsletter_theme";
pub const SUB_THEME_ARTICLES: &str = "sub_theme_articles";
/// Section text keyed by sub-theme
pub const RESULTS: &str = "results";
pub const MESSAGES: &str = "messages";

/// Main theme and the sub-themes to research under it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewsletterTheme {
    /// The main newsletter theme based on the provided article titles, framed as a question.
    pub theme: String,
    /// Sub-themes or key news items to investigate under the main theme; specific and researchable.
    pub sub_themes: Vec<String>,
}

pub fn schema() -> StateSchema {
    StateSchema::new()
        .field(KEYWORD, ReducerType::Overwrite)
        .field(LANGUAGE, ReducerType::Overwrite)
        .field(ARTICLE_TITLES, ReducerType::Overwrite)
        .field(NEWSLETTER_THEME, ReducerType::Overwrite)
        .field(SUB_THEME_ARTICLES, ReducerType::Overwrite)
        .field_with_default(RESULTS, ReducerType::Merge, json!({}))
        .field_with_default(MESSAGES, ReducerType::Append, json!([]))
}
