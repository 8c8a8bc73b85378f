//! Newsletter graph steps

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::prompt;
use super::state::{
    NewsletterTheme, ARTICLE_TITLES, KEYWORD, LANGUAGE, MESSAGES, NEWSLETTER_THEME, RESULTS,
    SUB_THEME_ARTICLES,
};
use crate::adk::error::{PracticeError, Result};
use crate::adk::model::{Content, Model, ResponseSchema};
use crate::adk::structured::generate_structured;
use crate::practice::tools::{Article, NewsSearch, SearchRequest};
use crate::practice::types::{ChatMessage, Language};
use crate::practice::workflow::graph::Step;
use crate::practice::workflow::state::{StateUpdate, WorkflowState};

/// Recent news titles for the keyword
pub struct SearchNews {
    pub search: Arc<dyn NewsSearch>,
    pub max_results: u32,
    pub days: u32,
}

#[async_trait]
impl Step for SearchNews {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let keyword: String = state.get_as(KEYWORD)?;
        let request = SearchRequest::news(keyword.as_str(), self.max_results, self.days);
        let response = self.search.search(&request).await?;

        let titles = response.titles();
        if titles.is_empty() {
            log::warn!("No recent news found for '{}'", keyword);
        }
        StateUpdate::new().set(ARTICLE_TITLES, titles)
    }
}

/// Theme and sub-themes from the article titles, as structured output
pub struct GenerateThemes {
    pub model: Arc<dyn Model>,
    pub max_sub_themes: usize,
}

#[async_trait]
impl Step for GenerateThemes {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let titles: Vec<String> = state.get_as(ARTICLE_TITLES)?;
        let language: Language = state.get_as(LANGUAGE)?;

        let history = vec![
            Content::system(prompt::generate_themes(language, self.max_sub_themes)),
            Content::user(prompt::article_titles(&titles)),
        ];
        let mut theme: NewsletterTheme = generate_structured(
            self.model.as_ref(),
            &history,
            ResponseSchema::of::<NewsletterTheme>(NEWSLETTER_THEME),
        )
        .await?;

        // Each sub-theme keys its own section
        let proposed = theme.sub_themes.len();
        let mut seen = HashSet::new();
        theme
            .sub_themes
            .retain(|sub| !sub.trim().is_empty() && seen.insert(sub.clone()));
        if theme.sub_themes.len() < proposed {
            log::warn!(
                "Dropped {} empty or repeated sub-themes",
                proposed - theme.sub_themes.len()
            );
        }

        if theme.sub_themes.len() > self.max_sub_themes {
            log::info!(
                "Keeping {} of {} sub-themes",
                self.max_sub_themes,
                theme.sub_themes.len()
            );
            theme.sub_themes.truncate(self.max_sub_themes);
        }
        log::info!("Newsletter theme: {}", theme.theme);

        StateUpdate::new().set(NEWSLETTER_THEME, theme)
    }
}

/// Article search for every sub-theme, run concurrently
pub struct SearchSubThemeArticles {
    pub search: Arc<dyn NewsSearch>,
    pub max_results: u32,
    pub days: u32,
}

impl SearchSubThemeArticles {
    /// A failed or empty search degrades to no articles
    async fn search_one(&self, sub_theme: &str) -> Vec<Article> {
        let request = SearchRequest::news(sub_theme, self.max_results, self.days)
            .with_images()
            .with_raw_content();

        match self.search.search(&request).await {
            Ok(response) => {
                let articles = response.into_articles();
                if articles.is_empty() {
                    log::warn!("No articles found related to '{}'", sub_theme);
                } else {
                    log::info!(
                        "Found {} articles related to '{}'",
                        articles.len(),
                        sub_theme
                    );
                }
                articles
            }
            Err(e) => {
                log::warn!("Search for '{}' failed: {}", sub_theme, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Step for SearchSubThemeArticles {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let theme: NewsletterTheme = state.get_as(NEWSLETTER_THEME)?;

        let found = join_all(theme.sub_themes.iter().map(|sub| self.search_one(sub))).await;

        if found.iter().all(Vec::is_empty) {
            return Err(PracticeError::NoContent(format!(
                "no articles found for any sub-theme of '{}'; try a different keyword",
                theme.theme
            )));
        }

        let mut articles = Map::new();
        for (sub, list) in theme.sub_themes.iter().zip(found) {
            articles.insert(sub.clone(), serde_json::to_value(list)?);
        }
        Ok(StateUpdate::new().set_value(SUB_THEME_ARTICLES, Value::Object(articles)))
    }
}

/// One newsletter section, for the sub-theme at `index`
pub struct WriteSection {
    pub index: usize,
    pub model: Arc<dyn Model>,
}

#[async_trait]
impl Step for WriteSection {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let theme: NewsletterTheme = state.get_as(NEWSLETTER_THEME)?;
        let Some(sub_theme) = theme.sub_themes.get(self.index) else {
            log::info!(
                "No sub-theme at position {}; only {} generated",
                self.index,
                theme.sub_themes.len()
            );
            return Ok(StateUpdate::new());
        };

        let language: Language = state.get_as(LANGUAGE)?;
        let mut all_articles: HashMap<String, Vec<Article>> = state.get_as(SUB_THEME_ARTICLES)?;
        let articles = all_articles.remove(sub_theme).unwrap_or_default();
        if articles.is_empty() {
            log::warn!("Writing '{}' without reference articles", sub_theme);
        }

        let request = prompt::write_section(
            sub_theme,
            &prompt::article_references(&articles),
            language,
        );
        let response = self
            .model
            .generate_content(&[Content::user(request)], None, None)
            .await?;

        Ok(StateUpdate::new().set_value(RESULTS, json!({ sub_theme.clone(): response.text() })))
    }
}

/// Assemble the written sections under the main theme
pub struct Aggregate;

#[async_trait]
impl Step for Aggregate {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let theme: NewsletterTheme = state.get_as(NEWSLETTER_THEME)?;
        let results: HashMap<String, String> = state.get_as(RESULTS)?;

        let mut combined = format!("# {}\n\n", theme.theme);
        for sub_theme in &theme.sub_themes {
            if let Some(content) = results.get(sub_theme) {
                combined.push_str(&format!("## {}\n{}\n\n", sub_theme, content));
            }
        }

        StateUpdate::new().set(MESSAGES, vec![ChatMessage::user(combined)])
    }
}

/// Final editorial pass over the aggregated draft
pub struct EditNewsletter {
    pub model: Arc<dyn Model>,
    pub enabled: bool,
}

#[async_trait]
impl Step for EditNewsletter {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        if !self.enabled {
            log::info!("Editing disabled; keeping the draft");
            return Ok(StateUpdate::new());
        }

        let theme: NewsletterTheme = state.get_as(NEWSLETTER_THEME)?;
        let language: Language = state.get_as(LANGUAGE)?;
        let messages: Vec<ChatMessage> = state.get_as(MESSAGES)?;
        let draft = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let request = prompt::edit_newsletter(&theme.theme, draft, language);
        let response = self
            .model
            .generate_content(&[Content::user(request)], None, None)
            .await?;

        StateUpdate::new().set(MESSAGES, vec![ChatMessage::assistant(response.text())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ModelError;
    use crate::adk::model::{GenerationConfig, Part};
    use crate::adk::tool::Tool;
    use crate::practice::newsletter::state::schema;
    use crate::practice::tools::{SearchHit, SearchImage, SearchResponse};
    use std::sync::Mutex;

    /// Replies with structured JSON when a schema is requested, else echoes a tag
    struct StubModel {
        structured: Value,
        prompts: Mutex<Vec<String>>,
    }

    impl StubModel {
        fn new(structured: Value) -> Arc<Self> {
            Arc::new(Self {
                structured,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Model for StubModel {
        async fn generate_content(
            &self,
            history: &[Content],
            config: Option<&GenerationConfig>,
            _tools: Option<&[Arc<dyn Tool>]>,
        ) -> Result<Content> {
            let prompt = history.last().map(Content::text).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);

            let text = if config.and_then(|c| c.response_schema.as_ref()).is_some() {
                self.structured.to_string()
            } else {
                "written".to_string()
            };
            Ok(Content {
                role: "model".to_string(),
                parts: vec![Part::Text(text)],
            })
        }
    }

    /// Results only for the listed queries; everything else is empty or an error
    struct StubSearch {
        hits: HashMap<String, usize>,
        fail: Vec<String>,
    }

    #[async_trait]
    impl NewsSearch for StubSearch {
        async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
            if self.fail.contains(&request.query) {
                return Err(PracticeError::api("Tavily", "timeout"));
            }
            let n = self.hits.get(&request.query).copied().unwrap_or(0);
            Ok(SearchResponse {
                query: request.query.clone(),
                results: (0..n)
                    .map(|i| SearchHit {
                        title: format!("{} article {}", request.query, i),
                        raw_content: Some("body".to_string()),
                        ..Default::default()
                    })
                    .collect(),
                images: vec![SearchImage::Url(format!("https://img/{}.png", request.query))],
            })
        }
    }

    fn state_with_theme(sub_themes: &[&str]) -> WorkflowState {
        let mut state = WorkflowState::new(&schema());
        state.update(LANGUAGE, json!("english"));
        state.update(
            NEWSLETTER_THEME,
            json!({"theme": "Is solar winning?", "sub_themes": sub_themes}),
        );
        state
    }

    #[tokio::test]
    async fn test_generate_themes_truncates_to_ceiling() {
        let model = StubModel::new(json!({
            "theme": "Is solar winning?",
            "sub_themes": ["a", "b", "c", "d", "e", "f", "g"]
        }));
        let step = GenerateThemes {
            model: model.clone(),
            max_sub_themes: 5,
        };

        let mut state = WorkflowState::new(&schema());
        state.update(LANGUAGE, json!("english"));
        state.update(ARTICLE_TITLES, json!(["Solar up", "Wind down"]));

        let update = step.run(&state).await.unwrap();
        assert_eq!(
            update.get(NEWSLETTER_THEME).unwrap()["sub_themes"],
            json!(["a", "b", "c", "d", "e"])
        );
        assert!(model.prompts.lock().unwrap()[0].contains("Solar up\nWind down"));
    }

    #[tokio::test]
    async fn test_generate_themes_drops_repeated_and_blank_sub_themes() {
        let model = StubModel::new(json!({
            "theme": "Is solar winning?",
            "sub_themes": ["Solar", "Solar", " ", "Wind", "Hydro", "Wind", "Nuclear", "Tidal", "Geo"]
        }));
        let step = GenerateThemes {
            model,
            max_sub_themes: 5,
        };

        let mut state = WorkflowState::new(&schema());
        state.update(LANGUAGE, json!("english"));
        state.update(ARTICLE_TITLES, json!(["Solar up"]));

        let update = step.run(&state).await.unwrap();
        assert_eq!(
            update.get(NEWSLETTER_THEME).unwrap()["sub_themes"],
            json!(["Solar", "Wind", "Hydro", "Nuclear", "Tidal"])
        );
    }

    #[tokio::test]
    async fn test_generate_themes_schema_violation() {
        let model = StubModel::new(json!({"headline": "missing fields"}));
        let step = GenerateThemes {
            model,
            max_sub_themes: 5,
        };

        let mut state = WorkflowState::new(&schema());
        state.update(LANGUAGE, json!("english"));
        state.update(ARTICLE_TITLES, json!([]));

        let err = step.run(&state).await.unwrap_err();
        assert!(matches!(
            err,
            PracticeError::Model(ModelError::SchemaViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_sub_theme_search_degrades_per_theme() {
        let step = SearchSubThemeArticles {
            search: Arc::new(StubSearch {
                hits: HashMap::from([("solar".to_string(), 2)]),
                fail: vec!["wind".to_string()],
            }),
            max_results: 3,
            days: 7,
        };

        let update = step
            .run(&state_with_theme(&["solar", "wind", "hydro"]))
            .await
            .unwrap();
        let articles = update.get(SUB_THEME_ARTICLES).unwrap();

        assert_eq!(articles["solar"].as_array().unwrap().len(), 2);
        assert_eq!(articles["solar"][0]["image_url"], "https://img/solar.png");
        assert_eq!(articles["solar"][1]["image_url"], Value::Null);
        assert_eq!(articles["wind"], json!([]));
        assert_eq!(articles["hydro"], json!([]));
    }

    #[tokio::test]
    async fn test_sub_theme_search_all_empty_is_no_content() {
        let step = SearchSubThemeArticles {
            search: Arc::new(StubSearch {
                hits: HashMap::new(),
                fail: vec!["wind".to_string()],
            }),
            max_results: 3,
            days: 7,
        };

        let err = step
            .run(&state_with_theme(&["solar", "wind"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PracticeError::NoContent(_)));
    }

    #[tokio::test]
    async fn test_write_section_beyond_sub_themes_is_noop() {
        let step = WriteSection {
            index: 3,
            model: StubModel::new(json!({})),
        };

        let update = step.run(&state_with_theme(&["solar", "wind"])).await.unwrap();
        assert!(update.is_empty());
    }

    #[tokio::test]
    async fn test_write_section_uses_article_references() {
        let model = StubModel::new(json!({}));
        let step = WriteSection {
            index: 1,
            model: model.clone(),
        };

        let mut state = state_with_theme(&["solar", "wind"]);
        state.update(
            SUB_THEME_ARTICLES,
            json!({
                "solar": [],
                "wind": [{"title": "Offshore boom", "image_url": null, "raw_content": "Turbines"}]
            }),
        );

        let update = step.run(&state).await.unwrap();
        assert_eq!(update.get(RESULTS), Some(&json!({"wind": "written"})));

        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("\"wind\""));
        assert!(prompt.contains("Title: Offshore boom\nContent: Turbines..."));
    }

    #[tokio::test]
    async fn test_aggregate_orders_by_sub_theme() {
        let mut state = state_with_theme(&["solar", "wind"]);
        state.update(RESULTS, json!({"wind": "W text", "solar": "S text"}));

        let update = Aggregate.run(&state).await.unwrap();
        assert_eq!(
            update.get(MESSAGES).unwrap()[0]["content"],
            "# Is solar winning?\n\n## solar\nS text\n\n## wind\nW text\n\n"
        );
    }

    #[tokio::test]
    async fn test_edit_disabled_keeps_draft() {
        let step = EditNewsletter {
            model: StubModel::new(json!({})),
            enabled: false,
        };
        let update = step.run(&state_with_theme(&["solar"])).await.unwrap();
        assert!(update.is_empty());
    }
}
