//! Stock ticker analysis team
//!
//! A supervisor routes the user's question through a researcher, a stock
//! analyzer and a chart generator, each a tool-calling agent, until every
//! member has contributed.

pub mod graph;
pub mod prompt;
pub mod routing;
pub mod state;
pub mod steps;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::adk::error::{PracticeError, Result};
use crate::practice::config::{Services, Settings};
use crate::practice::tools::extract_chart;
use crate::practice::types::{ChatMessage, Language};
use crate::practice::workflow::graph::{CompiledGraph, RunEvent, RunOutcome};
use crate::practice::workflow::state::StateUpdate;

pub use routing::TeamRouter;
pub use state::{FINISH, MEMBERS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRequest {
    pub question: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReport {
    /// Question followed by each member's contribution
    pub messages: Vec<ChatMessage>,
    /// Plotly figure from the chart generator, when one was produced
    pub chart: Option<Value>,
    pub trace: Vec<String>,
}

impl StockReport {
    fn from_outcome(outcome: RunOutcome) -> Result<Self> {
        let messages: Vec<ChatMessage> = outcome.state.get_as(state::MESSAGES)?;
        let chart = messages.iter().rev().find_map(|m| extract_chart(&m.content));
        if chart.is_none() {
            log::warn!("No chart found in the team's messages");
        }
        Ok(Self {
            messages,
            chart,
            trace: outcome.trace,
        })
    }

    /// Contribution of one team member, if it ran
    pub fn contribution(&self, member: &str) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.name.as_deref() == Some(member))
            .map(|m| m.content.as_str())
    }
}

pub struct StockPipeline {
    graph: CompiledGraph,
}

impl StockPipeline {
    pub async fn new(services: &Services, settings: &Settings) -> Result<Self> {
        Ok(Self {
            graph: graph::build_stock_graph(services, settings).await?,
        })
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub async fn run(&self, request: StockRequest) -> Result<StockReport> {
        let outcome = self.graph.invoke(seed(&request)?).await?;
        StockReport::from_outcome(outcome)
    }

    pub async fn stream(
        &self,
        request: StockRequest,
        tx: mpsc::Sender<RunEvent>,
    ) -> Result<StockReport> {
        let outcome = self.graph.stream(seed(&request)?, tx).await?;
        StockReport::from_outcome(outcome)
    }
}

fn seed(request: &StockRequest) -> Result<StateUpdate> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(PracticeError::InvalidInput(
            "question must not be empty".to_string(),
        ));
    }
    StateUpdate::new()
        .set(state::MESSAGES, vec![ChatMessage::user(question)])?
        .set(state::LANGUAGE, request.language)?
        .set(state::TRIALS, json!({}))
}
