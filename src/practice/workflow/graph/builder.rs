// SPDX-License-Identifier: MIT

//! Graph builder - declare steps and edges, then compile

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::executor::{CompiledGraph, CompiledNode, Route};
use super::types::{Edge, Step, WaitMode, END, START};
use crate::adk::error::{Result, WorkflowError};
use crate::practice::workflow::state::StateSchema;

/// Supersteps allowed before a run is aborted
pub const DEFAULT_RECURSION_LIMIT: u32 = 25;

/// Declarative graph of named steps over a shared state
pub struct StateGraph {
    name: String,
    schema: StateSchema,
    nodes: Vec<(String, Arc<dyn Step>, WaitMode)>,
    edges: Vec<Edge>,
    recursion_limit: u32,
}

impl StateGraph {
    pub fn new(name: impl Into<String>, schema: StateSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            nodes: Vec::new(),
            edges: Vec::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Add a step that waits for all of its direct predecessors
    pub fn add_node(&mut self, id: &str, step: impl Step + 'static) -> &mut Self {
        self.add_node_with(id, step, WaitMode::All)
    }

    pub fn add_node_with(
        &mut self,
        id: &str,
        step: impl Step + 'static,
        wait_mode: WaitMode,
    ) -> &mut Self {
        self.nodes.push((id.to_string(), Arc::new(step), wait_mode));
        self
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.edges.push(Edge::Direct {
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    /// Route from `from` by the value of `field`; each route maps a value to a step or END
    pub fn add_conditional_edges<I, K, V>(&mut self, from: &str, field: &str, routes: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.edges.push(Edge::Routed {
            from: from.to_string(),
            field: field.to_string(),
            routes: routes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
        self
    }

    pub fn with_recursion_limit(&mut self, limit: u32) -> &mut Self {
        self.recursion_limit = limit;
        self
    }

    /// Validate the declaration and produce an executable graph
    pub fn compile(self) -> Result<CompiledGraph> {
        let mut nodes: HashMap<String, CompiledNode> = HashMap::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for (id, step, wait_mode) in self.nodes {
            if id == START || id == END {
                return Err(WorkflowError::ReservedName(id).into());
            }
            if nodes.contains_key(&id) {
                return Err(WorkflowError::DuplicateStep(id).into());
            }
            order.push(id.clone());
            nodes.insert(
                id.clone(),
                CompiledNode {
                    id,
                    step,
                    wait_mode,
                    successors: Vec::new(),
                    route: None,
                    predecessors: HashSet::new(),
                },
            );
        }

        let mut entry = Vec::new();

        for edge in self.edges {
            if edge.from() == END {
                return Err(WorkflowError::ReservedName(END.to_string()).into());
            }

            match edge {
                Edge::Direct { from, to } => {
                    if to != END && !nodes.contains_key(&to) {
                        return Err(WorkflowError::UnknownStep(to).into());
                    }
                    if from == START {
                        if to != END {
                            entry.push(to.clone());
                        }
                    } else {
                        nodes
                            .get_mut(&from)
                            .ok_or_else(|| WorkflowError::UnknownStep(from.clone()))?
                            .successors
                            .push(to.clone());
                    }
                    if let Some(target) = nodes.get_mut(&to) {
                        target.predecessors.insert(from);
                    }
                }
                Edge::Routed {
                    from,
                    field,
                    routes,
                } => {
                    if from == START {
                        return Err(WorkflowError::ReservedName(START.to_string()).into());
                    }
                    if let Some(dest) = routes
                        .values()
                        .find(|dest| dest.as_str() != END && !nodes.contains_key(dest.as_str()))
                    {
                        return Err(WorkflowError::UnknownStep(dest.clone()).into());
                    }
                    let node = nodes
                        .get_mut(&from)
                        .ok_or_else(|| WorkflowError::UnknownStep(from.clone()))?;
                    if node.route.is_some() {
                        return Err(WorkflowError::DuplicateRoute(from).into());
                    }
                    node.route = Some(Route { field, routes });
                }
            }
        }

        if entry.is_empty() {
            return Err(WorkflowError::MissingEntry.into());
        }

        if let Some(dead_end) = order.iter().find(|id| {
            let node = &nodes[id.as_str()];
            node.successors.is_empty() && node.route.is_none()
        }) {
            return Err(WorkflowError::NoOutgoingEdge(dead_end.clone()).into());
        }

        log::info!(
            "Compiled graph '{}' with {} steps, entry {:?}",
            self.name,
            order.len(),
            entry
        );

        Ok(CompiledGraph {
            name: self.name,
            schema: self.schema,
            nodes,
            order,
            entry,
            recursion_limit: self.recursion_limit,
        })
    }
}
