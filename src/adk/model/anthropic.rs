//! Anthropic Model - Claude Messages API implementation
//!
//! Structured output is requested by forcing a single tool call whose input
//! schema is the response schema.

use super::{Content, GenerationConfig, Model, Part};
use crate::adk::error::{ModelError, PracticeError, Result};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::sync::Arc;

/// Anthropic Claude model implementation
pub struct AnthropicModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl AnthropicModel {
    /// Create a new AnthropicModel
    ///
    /// Requires `ANTHROPIC_API_KEY` environment variable to be set.
    /// Optionally uses `ANTHROPIC_BASE_URL` for custom endpoints.
    pub fn new(model_name: String) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("anthropic".to_string()))?;
        let base_url = env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1".to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url,
        })
    }

    /// Extract system message from history
    fn extract_system_message(history: &[Content]) -> Option<String> {
        history
            .iter()
            .find(|c| c.role == "system")
            .map(|c| c.text())
            .filter(|t| !t.is_empty())
    }

    /// Convert internal Content to Anthropic message format
    fn content_to_anthropic_message(content: &Content) -> Option<serde_json::Value> {
        // System messages go in the top-level `system` field
        if content.role == "system" {
            return None;
        }

        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        let message_content: Vec<serde_json::Value> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(t) => Some(json!({ "type": "text", "text": t })),
                // Unsigned thinking blocks are rejected when replayed
                Part::Thinking(_) => None,
                Part::FunctionCall { id, name, args } => Some(json!({
                    "type": "tool_use",
                    "id": id,
                    "name": name,
                    "input": args
                })),
                Part::FunctionResponse { id, response, .. } => Some(json!({
                    "type": "tool_result",
                    "tool_use_id": id,
                    "content": serde_json::to_string(response).unwrap_or_default()
                })),
            })
            .collect();

        if message_content.is_empty() {
            return None;
        }

        Some(json!({
            "role": role,
            "content": message_content
        }))
    }

    /// Convert tools to Anthropic tool format
    fn tools_to_anthropic_format(tools: &[Arc<dyn Tool>]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input_schema": t.schema()
                })
            })
            .collect()
    }

    /// Build the full request body
    fn build_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = history
            .iter()
            .filter_map(Self::content_to_anthropic_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "max_tokens": config.and_then(|c| c.max_output_tokens).unwrap_or(4096)
        });

        if let Some(sys) = Self::extract_system_message(history) {
            body["system"] = json!(sys);
        }

        let mut tool_defs = tools
            .map(Self::tools_to_anthropic_format)
            .unwrap_or_default();

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
            if let Some(top_k) = cfg.top_k {
                body["top_k"] = json!(top_k);
            }
            if let Some(schema) = &cfg.response_schema {
                tool_defs.push(json!({
                    "name": schema.name,
                    "description": "Return the answer in this exact structure.",
                    "input_schema": schema.schema
                }));
                body["tool_choice"] = json!({ "type": "tool", "name": schema.name });
            }
        }

        if !tool_defs.is_empty() {
            body["tools"] = json!(tool_defs);
        }

        body
    }

    /// Parse Anthropic response into Content
    fn parse_anthropic_response(response: &serde_json::Value) -> Result<Content> {
        let content_blocks = response["content"].as_array().ok_or_else(|| {
            ModelError::InvalidResponse("No content in Anthropic response".into())
        })?;

        let mut parts = Vec::new();

        for block in content_blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        if !text.is_empty() {
                            parts.push(Part::Text(text.to_string()));
                        }
                    }
                }
                Some("thinking") => {
                    if let Some(thinking) = block["thinking"].as_str() {
                        if !thinking.is_empty() {
                            parts.push(Part::Thinking(thinking.to_string()));
                        }
                    }
                }
                Some("tool_use") => {
                    let name = block["name"].as_str().unwrap_or_default().to_string();
                    let id = block["id"].as_str().unwrap_or(&name).to_string();
                    parts.push(Part::FunctionCall {
                        id,
                        name,
                        args: block["input"].clone(),
                    });
                }
                _ => {}
            }
        }

        if let Some(stop_reason) = response["stop_reason"].as_str() {
            log::debug!("Anthropic stop reason: {}", stop_reason);
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for AnthropicModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content> {
        let url = format!("{}/messages", self.base_url);
        let body = self.build_body(history, config, tools);

        log::debug!(
            "Anthropic request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(PracticeError::api("Anthropic", text));
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("Anthropic response: {}", resp_json);

        Self::parse_anthropic_response(&resp_json)
    }
}
