// SPDX-License-Identifier: MIT

//! Model module - defines LLM model trait and implementations
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [openai] - OpenAI's ChatGPT API

pub mod anthropic;
pub mod openai;

use crate::adk::error::{ModelError, Result};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    /// Constrain the reply to JSON matching this schema
    pub response_schema: Option<ResponseSchema>,
}

/// A named JSON schema for structured output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text parts (thinking excluded)
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Parts of a message - text, thinking, function calls, etc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Thinking/reasoning content from thinking models
    Thinking(String),
    /// Function/tool call requested by the model
    FunctionCall {
        id: String,
        name: String,
        args: serde_json::Value,
    },
    /// Response from executing a function/tool
    FunctionResponse {
        id: String,
        name: String,
        response: serde_json::Value,
    },
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content>;
}

/// Build a model from its name, inferring the provider unless one is given.
///
/// `gpt*`/`o1*`/`o3*` map to OpenAI and `claude*` to Anthropic.
pub fn from_name(model_name: &str, provider: Option<&str>) -> Result<Arc<dyn Model>> {
    let provider = provider.map(str::to_lowercase).unwrap_or_else(|| {
        if model_name.starts_with("claude") {
            "anthropic".to_string()
        } else {
            "openai".to_string()
        }
    });

    log::info!("Using provider: {} with model: {}", provider, model_name);

    let model: Arc<dyn Model> = match provider.as_str() {
        "openai" => Arc::new(openai::OpenAIModel::new(model_name.to_string())?),
        "anthropic" => Arc::new(anthropic::AnthropicModel::new(model_name.to_string())?),
        other => return Err(ModelError::UnsupportedProvider(other.to_string()).into()),
    };
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_text_skips_non_text_parts() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![
                Part::Thinking("hmm".to_string()),
                Part::Text("Hello ".to_string()),
                Part::Text("world".to_string()),
            ],
        };
        assert_eq!(content.text(), "Hello world");
    }

    #[test]
    fn test_from_name_rejects_unknown_provider() {
        let result = from_name("gpt-4o-mini", Some("bard"));
        assert!(matches!(
            result,
            Err(crate::adk::error::PracticeError::Model(
                ModelError::UnsupportedProvider(_)
            ))
        ));
    }
}
