// SPDX-License-Identifier: MIT

//! Agent module - defines agent types for AI workflows
//!
//! - `LLMAgent` - Standard LLM agent with tool calling

mod llm;

pub use llm::LLMAgent;

use crate::adk::error::Result;
use async_trait::async_trait;

/// Core agent trait for all agent types
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent name
    fn name(&self) -> &str;

    /// Run the agent with the given input
    async fn run(&self, input: String) -> Result<String>;
}
