// SPDX-License-Identifier: MIT

//! LLM Agent - Standard LLM agent with tool calling
//!
//! This agent sends prompts to an LLM and handles tool calls in a loop
//! until a text response is received.

use super::Agent;
use crate::adk::error::{PracticeError, Result};
use crate::adk::model::{Content, Model, Part};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_MAX_TURNS: u32 = 10;

/// Standard LLM agent with tool calling support
pub struct LLMAgent {
    pub name: String,
    pub instruction: String,
    pub model: Arc<dyn Model>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub max_turns: u32,
    /// HashMap for O(1) tool lookups
    tool_map: HashMap<String, usize>,
}

impl LLMAgent {
    pub fn new(
        name: String,
        instruction: String,
        model: Arc<dyn Model>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Self {
        let tool_map: HashMap<String, usize> = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();

        Self {
            name,
            instruction,
            model,
            tools,
            max_turns: DEFAULT_MAX_TURNS,
            tool_map,
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// O(1) tool lookup by name
    fn get_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tool_map.get(name).map(|&i| &self.tools[i])
    }

    /// Run one tool call; failures are reported back to the model as data
    async fn call_tool(&self, name: &str, args: &serde_json::Value) -> serde_json::Value {
        log::info!("Agent {} tool call: {} {}", self.name, name, args);

        match self.get_tool(name) {
            Some(t) => match t.execute(args.clone()).await {
                Ok(res) => res,
                Err(e) => {
                    log::error!("Tool {} failed: {}", name, e);
                    serde_json::json!({ "error": e.to_string() })
                }
            },
            None => {
                log::error!("Tool {} not found", name);
                serde_json::json!({ "error": PracticeError::tool_not_found(name).to_string() })
            }
        }
    }
}

#[async_trait]
impl Agent for LLMAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: String) -> Result<String> {
        let mut history = vec![Content::system(self.instruction.clone()), Content::user(input)];

        for turn in 0..self.max_turns {
            log::info!("Agent {} turn {}/{}", self.name, turn + 1, self.max_turns);
            let response = self
                .model
                .generate_content(&history, None, Some(&self.tools))
                .await?;

            let function_calls: Vec<(&str, &str, &serde_json::Value)> = response
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::FunctionCall { id, name, args } => {
                        Some((id.as_str(), name.as_str(), args))
                    }
                    _ => None,
                })
                .collect();

            if function_calls.is_empty() {
                let text = response.text();
                if text.is_empty() {
                    log::warn!(
                        "Agent {} received empty response with no function calls",
                        self.name
                    );
                } else {
                    log::info!(
                        "Agent {} returning text response (length: {}, preview: '{}')",
                        self.name,
                        text.len(),
                        text.chars().take(100).collect::<String>()
                    );
                }
                return Ok(text);
            }

            let mut function_responses = Vec::with_capacity(function_calls.len());
            for (id, name, args) in function_calls {
                let tool_response = self.call_tool(name, args).await;
                function_responses.push(Part::FunctionResponse {
                    id: id.to_string(),
                    name: name.to_string(),
                    response: tool_response,
                });
            }

            history.push(response);
            history.push(Content {
                role: "user".to_string(),
                parts: function_responses,
            });
        }

        log::error!(
            "Agent {} reached max turns without text response",
            self.name
        );
        Err(PracticeError::MaxIterations {
            kind: "turns".to_string(),
            limit: self.max_turns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::GenerationConfig;
    use once_cell::sync::Lazy;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    static ECHO_SCHEMA: Lazy<Value> = Lazy::new(|| json!({"type": "object"}));

    struct ScriptedModel {
        replies: Vec<Content>,
        index: AtomicUsize,
        last_history_len: Mutex<usize>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Content>) -> Self {
            Self {
                replies,
                index: AtomicUsize::new(0),
                last_history_len: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Model for ScriptedModel {
        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
            _tools: Option<&[Arc<dyn Tool>]>,
        ) -> Result<Content> {
            *self.last_history_len.lock().unwrap() = history.len();
            let i = self.index.fetch_add(1, Ordering::SeqCst);
            Ok(self.replies[i.min(self.replies.len() - 1)].clone())
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input"
        }

        fn schema(&self) -> &Value {
            &ECHO_SCHEMA
        }

        async fn execute(&self, input: Value) -> Result<Value> {
            Ok(json!({ "echo": input }))
        }
    }

    fn call(name: &str) -> Content {
        Content {
            role: "model".to_string(),
            parts: vec![Part::FunctionCall {
                id: "call_1".to_string(),
                name: name.to_string(),
                args: json!({"x": 1}),
            }],
        }
    }

    fn text(t: &str) -> Content {
        Content {
            role: "model".to_string(),
            parts: vec![Part::Text(t.to_string())],
        }
    }

    #[tokio::test]
    async fn test_returns_text_after_tool_call() {
        let model = Arc::new(ScriptedModel::new(vec![call("echo"), text("done")]));
        let agent = LLMAgent::new(
            "Researcher".to_string(),
            "You research.".to_string(),
            model.clone(),
            vec![Arc::new(EchoTool)],
        );

        let out = agent.run("AAPL".to_string()).await.unwrap();
        assert_eq!(out, "done");
        // system + user + model call + tool response
        assert_eq!(*model.last_history_len.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let model = Arc::new(ScriptedModel::new(vec![call("missing"), text("recovered")]));
        let agent = LLMAgent::new("a".to_string(), "i".to_string(), model, vec![]);

        let out = agent.run("go".to_string()).await.unwrap();
        assert_eq!(out, "recovered");
    }

    #[tokio::test]
    async fn test_max_turns_is_an_error() {
        let model = Arc::new(ScriptedModel::new(vec![call("echo")]));
        let agent = LLMAgent::new(
            "looper".to_string(),
            "i".to_string(),
            model,
            vec![Arc::new(EchoTool)],
        )
        .with_max_turns(3);

        let err = agent.run("go".to_string()).await.unwrap_err();
        assert!(matches!(
            err,
            PracticeError::MaxIterations { limit: 3, .. }
        ));
    }
}
