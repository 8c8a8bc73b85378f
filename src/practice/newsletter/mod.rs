//! Newsletter generator
//!
//! Turns a keyword into a themed newsletter: recent headlines pick a main
//! theme and sub-themes, each sub-theme gets its own researched section, and
//! the sections are assembled and edited into one document.

pub mod graph;
pub mod prompt;
pub mod state;
pub mod steps;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::adk::error::{PracticeError, Result};
use crate::practice::config::{Services, Settings};
use crate::practice::types::{ChatMessage, Language};
use crate::practice::workflow::graph::{CompiledGraph, RunEvent, RunOutcome};
use crate::practice::workflow::state::StateUpdate;

pub use state::NewsletterTheme;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterRequest {
    pub keyword: String,
    #[serde(default)]
    pub language: Language,
}

/// Finished newsletter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Newsletter {
    pub keyword: String,
    pub theme: NewsletterTheme,
    /// Section text keyed by sub-theme
    pub sections: HashMap<String, String>,
    /// Final markdown document
    pub content: String,
    /// Steps in the order they completed
    pub trace: Vec<String>,
}

impl Newsletter {
    fn from_outcome(outcome: RunOutcome) -> Result<Self> {
        let state = &outcome.state;
        let messages: Vec<ChatMessage> = state.get_as(state::MESSAGES)?;
        let content = messages
            .last()
            .map(|m| m.content.clone())
            .ok_or_else(|| PracticeError::other("newsletter run produced no messages"))?;

        Ok(Self {
            keyword: state.get_as(state::KEYWORD)?,
            theme: state.get_as(state::NEWSLETTER_THEME)?,
            sections: state.get_as(state::RESULTS)?,
            content,
            trace: outcome.trace,
        })
    }
}

pub struct NewsletterPipeline {
    graph: CompiledGraph,
}

impl NewsletterPipeline {
    pub fn new(services: &Services, settings: &Settings) -> Result<Self> {
        Ok(Self {
            graph: graph::build_newsletter_graph(services, settings)?,
        })
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub async fn run(&self, request: NewsletterRequest) -> Result<Newsletter> {
        let outcome = self.graph.invoke(seed(&request)?).await?;
        Newsletter::from_outcome(outcome)
    }

    /// Run while reporting step events on `tx`
    pub async fn stream(
        &self,
        request: NewsletterRequest,
        tx: mpsc::Sender<RunEvent>,
    ) -> Result<Newsletter> {
        let outcome = self.graph.stream(seed(&request)?, tx).await?;
        Newsletter::from_outcome(outcome)
    }
}

fn seed(request: &NewsletterRequest) -> Result<StateUpdate> {
    let keyword = request.keyword.trim();
    if keyword.is_empty() {
        return Err(PracticeError::InvalidInput(
            "keyword must not be empty".to_string(),
        ));
    }
    log::info!(
        "Generating {} newsletter for '{}'",
        request.language,
        keyword
    );
    StateUpdate::new()
        .set(state::KEYWORD, keyword)?
        .set(state::LANGUAGE, request.language)
}
