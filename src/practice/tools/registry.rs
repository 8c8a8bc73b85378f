// SPDX-License-Identifier: MIT

use crate::adk::error::{PracticeError, Result};
use crate::adk::tool::Tool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Named tools shared by the agents of a run
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write().await;
        log::debug!("Registering tool {}", tool.name());
        tools.insert(tool.name().to_string(), tool);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// Look up every name, failing on the first one that is not registered
    pub async fn resolve(&self, names: &[&str]) -> Result<Vec<Arc<dyn Tool>>> {
        let tools = self.tools.read().await;
        names
            .iter()
            .map(|name| {
                tools
                    .get(*name)
                    .cloned()
                    .ok_or_else(|| PracticeError::tool_not_found(*name))
            })
            .collect()
    }

    pub async fn names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
