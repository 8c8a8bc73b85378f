// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::schema::{ReducerType, StateSchema};
use crate::adk::error::{Result, WorkflowError};

/// Runtime workflow state with reducer support
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// Current state values
    fields: HashMap<String, Value>,
    /// Reducers for each field
    reducers: HashMap<String, ReducerType>,
}

impl WorkflowState {
    /// Create a new WorkflowState from a schema
    pub fn new(schema: &StateSchema) -> Self {
        let mut fields = HashMap::new();
        let mut reducers = HashMap::new();

        for (name, def) in &schema.fields {
            if let Some(default) = &def.default {
                fields.insert(name.clone(), default.clone());
            }
            reducers.insert(name.clone(), def.reducer);
        }

        Self { fields, reducers }
    }

    /// Create an empty WorkflowState
    pub fn empty() -> Self {
        Self {
            fields: HashMap::new(),
            reducers: HashMap::new(),
        }
    }

    /// Reducer used for a field
    pub fn reducer(&self, key: &str) -> ReducerType {
        self.reducers.get(key).copied().unwrap_or_default()
    }

    /// Update a field using the appropriate reducer
    pub fn update(&mut self, key: &str, value: Value) {
        match self.reducer(key) {
            ReducerType::Overwrite => {
                self.fields.insert(key.to_string(), value);
            }
            ReducerType::Append => {
                let arr = self
                    .fields
                    .entry(key.to_string())
                    .or_insert(Value::Array(vec![]));
                if let Value::Array(a) = arr {
                    match value {
                        Value::Array(new_items) => a.extend(new_items),
                        other => a.push(other),
                    }
                }
            }
            ReducerType::Merge => {
                let current = self
                    .fields
                    .entry(key.to_string())
                    .or_insert(Value::Object(Map::new()));
                match (current, value) {
                    (Value::Object(current_obj), Value::Object(new_obj)) => {
                        for (k, v) in new_obj {
                            current_obj.insert(k, v);
                        }
                    }
                    (_, other) => {
                        log::warn!("Merge into '{}' ignored non-object value: {}", key, other);
                    }
                }
            }
        }
    }

    /// Merge every field of a partial update
    pub fn apply(&mut self, update: &StateUpdate) {
        for (key, value) in update.iter() {
            self.update(key, value.clone());
        }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Decode a field into a typed value.
    ///
    /// Fails with [`WorkflowError::MissingField`] when no step has written it.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .fields
            .get(key)
            .ok_or_else(|| WorkflowError::MissingField(key.to_string()))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Get a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Get a nested field value using dot notation (e.g., "newsletter_theme.theme")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Partial state produced by one step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StateUpdate(Map<String, Value>);

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, serializing the value
    pub fn set(mut self, key: &str, value: impl Serialize) -> Result<Self> {
        self.0.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Set a field from an existing JSON value
    pub fn set_value(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for StateUpdate {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
