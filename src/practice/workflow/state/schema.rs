// SPDX-License-Identifier: MIT

//! State schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema defining the workflow state structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: HashMap<String, StateFieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StateFieldDef {
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value
    pub default: Option<serde_json::Value>,
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Append to array
    Append,
    /// Union of object keys, new keys win
    Merge,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field with a reducer and no default
    pub fn field(mut self, name: &str, reducer: ReducerType) -> Self {
        self.fields.insert(
            name.to_string(),
            StateFieldDef {
                reducer,
                default: None,
            },
        );
        self
    }

    /// Declare a field with a reducer and a default value
    pub fn field_with_default(
        mut self,
        name: &str,
        reducer: ReducerType,
        default: serde_json::Value,
    ) -> Self {
        self.fields.insert(
            name.to_string(),
            StateFieldDef {
                reducer,
                default: Some(default),
            },
        );
        self
    }

    /// Reducer for a field; undeclared fields overwrite
    pub fn reducer(&self, name: &str) -> ReducerType {
        self.fields
            .get(name)
            .map(|f| f.reducer)
            .unwrap_or_default()
    }
}
