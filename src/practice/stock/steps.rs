//! Supervisor and team member steps

use async_trait::async_trait;
use chrono::Local;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use super::prompt;
use super::routing::TeamRouter;
use super::state::{RouteResponse, LANGUAGE, MESSAGES, NEXT, TRIALS};
use crate::adk::agent::{Agent, LLMAgent};
use crate::adk::error::Result;
use crate::adk::model::{Content, Model};
use crate::adk::structured::generate_structured;
use crate::adk::tool::Tool;
use crate::practice::types::{ChatMessage, Language};
use crate::practice::workflow::graph::Step;
use crate::practice::workflow::state::{StateUpdate, WorkflowState};

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Render the message history as plain text for an agent
pub fn transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.name.as_deref().unwrap_or(&m.role), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Picks the next team member, or FINISH
pub struct SupervisorStep {
    pub model: Arc<dyn Model>,
    pub router: TeamRouter,
}

#[async_trait]
impl Step for SupervisorStep {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let messages: Vec<ChatMessage> = state.get_as(MESSAGES)?;
        let trials: HashMap<String, u32> = state.get_as(TRIALS)?;
        let language: Language = state.get_as(LANGUAGE)?;

        let last = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let history = vec![
            Content::system(prompt::supervisor(
                self.router.members(),
                language,
                &today(),
            )),
            Content::user(last),
        ];

        let response: RouteResponse =
            generate_structured(self.model.as_ref(), &history, self.router.route_schema()).await?;
        self.router.validate(&response.next)?;

        let next = self.router.decide(&response.next, &trials);
        log::info!("Supervisor proposed {}, routing to {}", response.next, next);

        StateUpdate::new().set(NEXT, next)
    }
}

/// A team member backed by a tool-calling agent
pub struct WorkerStep {
    pub name: String,
    pub model: Arc<dyn Model>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub max_turns: u32,
}

impl WorkerStep {
    fn agent(&self, language: Language) -> LLMAgent {
        LLMAgent::new(
            self.name.clone(),
            prompt::member(&self.name, language, &today()),
            self.model.clone(),
            self.tools.clone(),
        )
        .with_max_turns(self.max_turns)
    }
}

#[async_trait]
impl Step for WorkerStep {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        let messages: Vec<ChatMessage> = state.get_as(MESSAGES)?;
        let trials: HashMap<String, u32> = state.get_as(TRIALS)?;
        let language: Language = state.get_as(LANGUAGE)?;

        let visit = trials.get(&self.name).copied().unwrap_or(0) + 1;
        log::info!("{} is working (trial {})", self.name, visit);

        let answer = self.agent(language).run(transcript(&messages)).await?;

        StateUpdate::new()
            .set(MESSAGES, vec![ChatMessage::named(self.name.as_str(), answer)])?
            .set(TRIALS, json!({ self.name.clone(): visit }))
    }
}
