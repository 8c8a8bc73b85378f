//! Stock analysis run state

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::practice::workflow::state::{ReducerType, StateSchema};

pub const MESSAGES: &str = "messages";
/// Routing decision written by the supervisor
pub const NEXT: &str = "next";
pub const LANGUAGE: &str = "language";
/// Visit count per team member
pub const TRIALS: &str = "trials";

pub const RESEARCHER: &str = "Researcher";
pub const STOCK_ANALYZER: &str = "Stock_Analyzer";
pub const CHART_GENERATOR: &str = "Chart_Generator";

/// Team members in routing order
pub const MEMBERS: [&str; 3] = [RESEARCHER, STOCK_ANALYZER, CHART_GENERATOR];

/// Routing value that ends the run
pub const FINISH: &str = "FINISH";

/// Supervisor's structured reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub next: String,
}

pub fn schema() -> StateSchema {
    StateSchema::new()
        .field_with_default(MESSAGES, ReducerType::Append, json!([]))
        .field(NEXT, ReducerType::Overwrite)
        .field(LANGUAGE, ReducerType::Overwrite)
        .field_with_default(TRIALS, ReducerType::Merge, json!({}))
}
