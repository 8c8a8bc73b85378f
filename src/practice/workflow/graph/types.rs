//! Graph workflow type definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::adk::error::Result;
use crate::practice::workflow::state::{StateUpdate, WorkflowState};

/// Entry marker; edges from START name the first steps to run
pub const START: &str = "__start__";
/// Terminal marker; reaching it ends the run
pub const END: &str = "__end__";

/// A unit of work in a graph.
///
/// A step reads what it needs from the shared state and returns only the
/// fields it produced. The executor owns the merge.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate>;
}

/// Adapter for pure synchronous steps
pub struct FnStep<F>(pub F);

impl<F> FnStep<F>
where
    F: Fn(&WorkflowState) -> Result<StateUpdate> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&WorkflowState) -> Result<StateUpdate> + Send + Sync,
{
    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate> {
        (self.0)(state)
    }
}

/// An edge between two steps
#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    /// Always taken after `from` completes
    Direct { from: String, to: String },
    /// Destination chosen by the string value of `field` after `from` completes
    Routed {
        from: String,
        field: String,
        routes: HashMap<String, String>,
    },
}

impl Edge {
    pub fn from(&self) -> &str {
        match self {
            Edge::Direct { from, .. } | Edge::Routed { from, .. } => from,
        }
    }
}

/// How to wait for dependencies
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    /// Wait for ALL direct predecessors to complete (default)
    #[default]
    All,
    /// Run when ANY predecessor completes
    Any,
}
