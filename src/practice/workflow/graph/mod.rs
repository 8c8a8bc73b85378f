// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! Steps are declared on a [`StateGraph`], wired with direct or routed
//! edges, and compiled into a [`CompiledGraph`] that runs them in
//! supersteps over a shared [`WorkflowState`](crate::practice::workflow::state::WorkflowState).

pub mod builder;
pub mod events;
pub mod executor;
pub mod types;

pub use builder::{StateGraph, DEFAULT_RECURSION_LIMIT};
pub use events::RunEvent;
pub use executor::{CompiledGraph, CompiledNode, RunOutcome};
pub use types::{Edge, FnStep, Step, WaitMode, END, START};
