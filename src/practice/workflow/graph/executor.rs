//! Graph workflow executor
//!
//! Runs a compiled graph in supersteps. Every step that is ready in a
//! superstep sees the same state snapshot; their updates are merged through
//! the schema reducers once all of them have finished.

use futures::future::join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::RunEvent;
use super::types::{Step, WaitMode, END, START};
use crate::adk::error::{PracticeError, Result, WorkflowError};
use crate::practice::workflow::state::{ReducerType, StateSchema, StateUpdate, WorkflowState};

/// Routed edge set attached to a node
pub(crate) struct Route {
    pub field: String,
    pub routes: HashMap<String, String>,
}

/// Compiled node ready for execution
pub struct CompiledNode {
    pub id: String,
    pub step: Arc<dyn Step>,
    pub wait_mode: WaitMode,
    /// Direct successors, in edge declaration order
    pub successors: Vec<String>,
    pub(crate) route: Option<Route>,
    /// Sources of direct edges into this node, START included
    pub predecessors: HashSet<String>,
}

/// Graph ready to run
pub struct CompiledGraph {
    pub(crate) name: String,
    pub(crate) schema: StateSchema,
    pub(crate) nodes: HashMap<String, CompiledNode>,
    pub(crate) order: Vec<String>,
    pub(crate) entry: Vec<String>,
    pub(crate) recursion_limit: u32,
}

/// Final state plus the steps that completed, in merge order
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: WorkflowState,
    pub trace: Vec<String>,
}

#[derive(Debug, Default)]
struct Trigger {
    from: HashSet<String>,
    routed: bool,
}

async fn emit(tx: Option<&mpsc::Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event).await;
    }
}

impl CompiledGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Step ids in declaration order
    pub fn step_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    /// Schema defaults overlaid with the caller's seed fields
    pub fn initial_state(&self, seed: &StateUpdate) -> WorkflowState {
        let mut state = WorkflowState::new(&self.schema);
        state.apply(seed);
        state
    }

    /// Run to completion
    pub async fn invoke(&self, seed: StateUpdate) -> Result<RunOutcome> {
        self.execute(seed, None).await
    }

    /// Run to completion, sending a [`RunEvent`] for every step transition
    pub async fn stream(&self, seed: StateUpdate, tx: mpsc::Sender<RunEvent>) -> Result<RunOutcome> {
        self.execute(seed, Some(&tx)).await
    }

    async fn execute(
        &self,
        seed: StateUpdate,
        tx: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let mut state = self.initial_state(&seed);
        let mut trace = Vec::new();

        log::info!("Graph '{}' run {} started", self.name, run_id);

        match self.drive(&run_id, &mut state, &mut trace, tx).await {
            Ok(()) => {
                log::info!(
                    "Graph '{}' run {} finished after {} steps",
                    self.name,
                    run_id,
                    trace.len()
                );
                emit(
                    tx,
                    RunEvent::Finished {
                        run_id,
                        state: state.to_json(),
                    },
                )
                .await;
                Ok(RunOutcome { state, trace })
            }
            Err(e) => {
                log::error!("Graph '{}' run {} failed: {}", self.name, run_id, e);
                let step = match &e {
                    PracticeError::Workflow(WorkflowError::StepFailed { step, .. }) => {
                        Some(step.clone())
                    }
                    _ => None,
                };
                emit(
                    tx,
                    RunEvent::Failed {
                        run_id,
                        step,
                        error: e.to_string(),
                        state: state.to_json(),
                    },
                )
                .await;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        run_id: &str,
        state: &mut WorkflowState,
        trace: &mut Vec<String>,
        tx: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<()> {
        let mut pending: HashMap<String, Trigger> = HashMap::new();
        for id in &self.entry {
            pending
                .entry(id.clone())
                .or_default()
                .from
                .insert(START.to_string());
        }

        let mut superstep: u32 = 0;

        loop {
            let ready = self.ready_nodes(&pending);

            if ready.is_empty() {
                let mut stalled: Vec<String> = pending.keys().cloned().collect();
                stalled.sort();
                return Err(WorkflowError::Stalled(stalled).into());
            }

            superstep += 1;
            if superstep > self.recursion_limit {
                return Err(WorkflowError::RecursionLimit(self.recursion_limit).into());
            }

            let ids: Vec<&str> = ready.iter().map(|n| n.id.as_str()).collect();
            log::info!(
                "Graph '{}' superstep {}: executing {} steps: {:?}",
                self.name,
                superstep,
                ready.len(),
                ids
            );

            for node in &ready {
                pending.remove(&node.id);
                emit(
                    tx,
                    RunEvent::StepStarted {
                        run_id: run_id.to_string(),
                        step: node.id.clone(),
                    },
                )
                .await;
            }

            let snapshot: &WorkflowState = state;
            let results = join_all(ready.iter().map(|node| node.step.run(snapshot))).await;

            let mut completed: Vec<(&CompiledNode, StateUpdate)> = Vec::with_capacity(ready.len());
            let mut failure: Option<(String, PracticeError)> = None;

            for (node, result) in ready.iter().zip(results) {
                match result {
                    Ok(update) => completed.push((*node, update)),
                    Err(e) if failure.is_none() => failure = Some((node.id.clone(), e)),
                    Err(e) => log::error!("Step {} also failed: {}", node.id, e),
                }
            }

            check_conflicts(state, &completed)?;

            for (node, update) in &completed {
                state.apply(update);
                trace.push(node.id.clone());
                log::info!("Step {} completed", node.id);
                emit(
                    tx,
                    RunEvent::StepCompleted {
                        run_id: run_id.to_string(),
                        step: node.id.clone(),
                        update: update.to_json(),
                        state: state.to_json(),
                    },
                )
                .await;
            }

            if let Some((step, source)) = failure {
                return Err(WorkflowError::StepFailed {
                    step,
                    source: Box::new(source),
                }
                .into());
            }

            let mut finished = false;
            for (node, _) in &completed {
                for succ in &node.successors {
                    if succ == END {
                        finished = true;
                    } else {
                        pending
                            .entry(succ.clone())
                            .or_default()
                            .from
                            .insert(node.id.clone());
                    }
                }

                if let Some(route) = &node.route {
                    let value = state.get_str(&route.field).ok_or_else(|| {
                        WorkflowError::MissingRouteField {
                            step: node.id.clone(),
                            field: route.field.clone(),
                        }
                    })?;
                    let dest = route
                        .routes
                        .get(value)
                        .ok_or_else(|| WorkflowError::UnknownRoute {
                            step: node.id.clone(),
                            value: value.to_string(),
                        })?;
                    log::debug!("Step {} routed '{}' to {}", node.id, value, dest);
                    if dest == END {
                        finished = true;
                    } else {
                        let trigger = pending.entry(dest.clone()).or_default();
                        trigger.from.insert(node.id.clone());
                        trigger.routed = true;
                    }
                }
            }

            if finished {
                if !pending.is_empty() {
                    let mut dropped: Vec<&String> = pending.keys().collect();
                    dropped.sort();
                    log::warn!(
                        "Graph '{}' reached END with pending steps {:?}; they will not run",
                        self.name,
                        dropped
                    );
                }
                return Ok(());
            }
        }
    }

    /// Pending nodes whose wait condition holds, in declaration order
    fn ready_nodes(&self, pending: &HashMap<String, Trigger>) -> Vec<&CompiledNode> {
        self.order
            .iter()
            .filter_map(|id| {
                let trigger = pending.get(id)?;
                let node = self.nodes.get(id)?;
                is_ready(node, trigger).then_some(node)
            })
            .collect()
    }
}

fn is_ready(node: &CompiledNode, trigger: &Trigger) -> bool {
    if trigger.routed {
        return true;
    }
    if trigger.from.is_empty() {
        return false;
    }
    match node.wait_mode {
        WaitMode::Any => true,
        WaitMode::All => node.predecessors.iter().all(|p| trigger.from.contains(p)),
    }
}

/// Reject a superstep in which two steps wrote the same overwrite field or
/// the same key of a merge field
fn check_conflicts(state: &WorkflowState, completed: &[(&CompiledNode, StateUpdate)]) -> Result<()> {
    if completed.len() < 2 {
        return Ok(());
    }

    let mut writers: Vec<(&str, Vec<&str>)> = Vec::new();
    for (node, update) in completed {
        for (field, _) in update.iter() {
            match writers.iter_mut().find(|entry| entry.0 == field.as_str()) {
                Some((_, steps)) => steps.push(node.id.as_str()),
                None => writers.push((field.as_str(), vec![node.id.as_str()])),
            }
        }
    }

    for (field, steps) in writers {
        if steps.len() < 2 {
            continue;
        }
        match state.reducer(field) {
            ReducerType::Append => {}
            ReducerType::Overwrite => {
                return Err(conflict(field, steps));
            }
            ReducerType::Merge => {
                let mut owners: HashMap<&str, &str> = HashMap::new();
                for (node, update) in completed {
                    let Some(Value::Object(obj)) = update.get(field) else {
                        continue;
                    };
                    for key in obj.keys() {
                        if let Some(previous) = owners.insert(key.as_str(), node.id.as_str()) {
                            return Err(conflict(
                                &format!("{}.{}", field, key),
                                vec![previous, node.id.as_str()],
                            ));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn conflict(field: &str, steps: Vec<&str>) -> PracticeError {
    WorkflowError::ConflictingUpdate {
        field: field.to_string(),
        steps: steps.into_iter().map(String::from).collect(),
    }
    .into()
}
