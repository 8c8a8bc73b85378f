//! Supervisor routing rules
//!
//! The model proposes the next member; the router enforces that every member
//! runs, that nobody exceeds the visit ceiling, and that the run ends once
//! everyone has been visited.

use serde_json::json;
use std::collections::HashMap;

use super::state::{FINISH, MEMBERS};
use crate::adk::error::{ModelError, Result};
use crate::adk::model::ResponseSchema;

pub const ROUTE_SCHEMA_NAME: &str = "route";

#[derive(Debug, Clone)]
pub struct TeamRouter {
    members: Vec<String>,
    max_trials: u32,
}

impl Default for TeamRouter {
    fn default() -> Self {
        Self::new(MEMBERS.iter().map(|m| m.to_string()).collect(), 1)
    }
}

impl TeamRouter {
    pub fn new(members: Vec<String>, max_trials: u32) -> Self {
        Self {
            members,
            max_trials,
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn max_trials(&self) -> u32 {
        self.max_trials
    }

    /// Supersteps a run can take before routing ends it
    ///
    /// Every member but the last to be reached may use the full ceiling,
    /// and each member visit is preceded by a supervisor visit.
    pub fn superstep_bound(&self) -> u32 {
        let members = self.members.len() as u32;
        let worker_visits = members
            .saturating_sub(1)
            .saturating_mul(self.max_trials)
            .saturating_add(1);
        worker_visits.saturating_mul(2).saturating_add(1)
    }

    /// Structured-output schema restricting `next` to a member or FINISH
    pub fn route_schema(&self) -> ResponseSchema {
        let mut options: Vec<&str> = self.members.iter().map(String::as_str).collect();
        options.push(FINISH);

        ResponseSchema {
            name: ROUTE_SCHEMA_NAME.to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "next": {
                        "type": "string",
                        "enum": options,
                        "description": "The team member to act next, or FINISH when the answer is complete"
                    }
                },
                "required": ["next"]
            }),
        }
    }

    /// Reject a proposal outside the allowed set
    pub fn validate(&self, requested: &str) -> Result<()> {
        if requested == FINISH || self.members.iter().any(|m| m == requested) {
            Ok(())
        } else {
            Err(ModelError::InvalidResponse(format!(
                "supervisor chose unknown member '{}'",
                requested
            ))
            .into())
        }
    }

    /// Final routing decision given the model's proposal and the visit counts
    pub fn decide(&self, requested: &str, trials: &HashMap<String, u32>) -> String {
        let count = |member: &str| trials.get(member).copied().unwrap_or(0);

        let Some(first_unvisited) = self.members.iter().find(|m| count(m.as_str()) == 0) else {
            return FINISH.to_string();
        };

        if requested == FINISH {
            log::info!(
                "Supervisor asked to finish early; routing to {}",
                first_unvisited
            );
            return first_unvisited.clone();
        }

        let Some(position) = self.members.iter().position(|m| m == requested) else {
            return FINISH.to_string();
        };

        if count(requested) >= self.max_trials {
            let next = self.members[position + 1..]
                .iter()
                .find(|m| count(m.as_str()) < self.max_trials)
                .unwrap_or(first_unvisited)
                .clone();
            log::info!(
                "{} reached max trials ({}/{}); routing to {}",
                requested,
                count(requested),
                self.max_trials,
                next
            );
            return next;
        }

        requested.to_string()
    }
}
