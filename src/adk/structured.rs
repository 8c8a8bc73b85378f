// SPDX-License-Identifier: MIT

//! Structured output - ask a model for JSON matching a schema
//!
//! Providers return structured output either as a JSON text body (OpenAI
//! `json_schema`) or as a forced tool call (Anthropic). Both shapes are
//! accepted here. A reply that does not fit the schema is a
//! [`ModelError::SchemaViolation`]; nothing is retried.

use crate::adk::error::{ModelError, Result};
use crate::adk::model::{Content, GenerationConfig, Model, Part, ResponseSchema};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

impl ResponseSchema {
    /// Derive the schema from a `JsonSchema` type
    pub fn of<T: JsonSchema>(name: impl Into<String>) -> Self {
        let mut schema =
            serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| Value::Null);
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
        }
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Run one completion constrained to `schema` and decode it into `T`
pub async fn generate_structured<T: DeserializeOwned>(
    model: &dyn Model,
    history: &[Content],
    schema: ResponseSchema,
) -> Result<T> {
    let name = schema.name.clone();
    let config = GenerationConfig {
        temperature: Some(0.0),
        response_schema: Some(schema),
        ..Default::default()
    };

    let response = model.generate_content(history, Some(&config), None).await?;
    let value = extract_structured(&response, &name)?;

    serde_json::from_value(value).map_err(|e| {
        ModelError::SchemaViolation {
            schema: name,
            message: e.to_string(),
        }
        .into()
    })
}

/// Pull the JSON payload out of a structured-output response
pub fn extract_structured(response: &Content, schema_name: &str) -> Result<Value> {
    for part in &response.parts {
        if let Part::FunctionCall { name, args, .. } = part {
            if name == schema_name {
                return Ok(args.clone());
            }
        }
    }

    let text = response.text();
    let body = strip_code_fence(&text);
    serde_json::from_str(body).map_err(|e| {
        ModelError::SchemaViolation {
            schema: schema_name.to_string(),
            message: format!("{} (body: {})", e, body),
        }
        .into()
    })
}

/// Remove a surrounding ```json fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}
