//! Newsletter graph wiring
//!
//! ```text
//! START -> search_news -> generate_themes -> search_sub_theme_articles
//!       -> write_section_0..N (parallel) -> aggregate -> edit_newsletter -> END
//! ```

use super::state;
use super::steps::{
    Aggregate, EditNewsletter, GenerateThemes, SearchNews, SearchSubThemeArticles, WriteSection,
};
use crate::adk::error::Result;
use crate::practice::config::{Services, Settings};
use crate::practice::workflow::graph::{CompiledGraph, StateGraph, END, START};

pub const SEARCH_NEWS: &str = "search_news";
pub const GENERATE_THEMES: &str = "generate_themes";
pub const SEARCH_SUB_THEME_ARTICLES: &str = "search_sub_theme_articles";
pub const AGGREGATE: &str = "aggregate";
pub const EDIT_NEWSLETTER: &str = "edit_newsletter";

pub fn write_section_id(index: usize) -> String {
    format!("write_section_{}", index)
}

pub fn build_newsletter_graph(services: &Services, settings: &Settings) -> Result<CompiledGraph> {
    let cfg = &settings.newsletter;
    let mut graph = StateGraph::new("newsletter", state::schema());

    graph
        .add_node(
            SEARCH_NEWS,
            SearchNews {
                search: services.search.clone(),
                max_results: cfg.keyword_results,
                days: cfg.keyword_days,
            },
        )
        .add_node(
            GENERATE_THEMES,
            GenerateThemes {
                model: services.model.clone(),
                max_sub_themes: cfg.sections,
            },
        )
        .add_node(
            SEARCH_SUB_THEME_ARTICLES,
            SearchSubThemeArticles {
                search: services.search.clone(),
                max_results: cfg.sub_theme_results,
                days: cfg.sub_theme_days,
            },
        );

    for index in 0..cfg.sections {
        let id = write_section_id(index);
        graph
            .add_node(
                &id,
                WriteSection {
                    index,
                    model: services.model.clone(),
                },
            )
            .add_edge(SEARCH_SUB_THEME_ARTICLES, &id)
            .add_edge(&id, AGGREGATE);
    }

    graph
        .add_node(AGGREGATE, Aggregate)
        .add_node(
            EDIT_NEWSLETTER,
            EditNewsletter {
                model: services.model.clone(),
                enabled: cfg.edit,
            },
        )
        .add_edge(START, SEARCH_NEWS)
        .add_edge(SEARCH_NEWS, GENERATE_THEMES)
        .add_edge(GENERATE_THEMES, SEARCH_SUB_THEME_ARTICLES)
        .add_edge(AGGREGATE, EDIT_NEWSLETTER)
        .add_edge(EDIT_NEWSLETTER, END)
        .with_recursion_limit(settings.executor.recursion_limit);

    graph.compile()
}
