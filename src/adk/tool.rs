use crate::adk::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for tools that can be called by agents.
///
/// `name()`, `description()` and `schema()` return borrowed data; implementations
/// store them in struct fields or statics.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (must be unique within an agent's tool set)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Execute the tool with the given input and return the result
    async fn execute(&self, input: Value) -> Result<Value>;
}
