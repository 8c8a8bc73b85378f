// SPDX-License-Identifier: MIT

//! State management for graph workflows
//!
//! This module provides:
//! - `StateSchema` - declares reducers and defaults for state fields
//! - `WorkflowState` - runtime state storage with reducer support
//! - `StateUpdate` - the partial state a step returns

mod schema;
mod store;

pub use schema::{ReducerType, StateFieldDef, StateSchema};
pub use store::{StateUpdate, WorkflowState};
