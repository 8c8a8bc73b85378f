//! Events emitted to observers while a graph runs

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    StepStarted {
        run_id: String,
        step: String,
    },
    /// `update` is what the step returned; `state` is the merged snapshot
    StepCompleted {
        run_id: String,
        step: String,
        update: Value,
        state: Value,
    },
    Finished {
        run_id: String,
        state: Value,
    },
    Failed {
        run_id: String,
        step: Option<String>,
        error: String,
        state: Value,
    },
}

impl RunEvent {
    /// Step name for step-level events
    pub fn step(&self) -> Option<&str> {
        match self {
            RunEvent::StepStarted { step, .. } | RunEvent::StepCompleted { step, .. } => {
                Some(step)
            }
            RunEvent::Failed { step, .. } => step.as_deref(),
            RunEvent::Finished { .. } => None,
        }
    }
}
