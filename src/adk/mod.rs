//! Agent development kit: models, tools, agents and errors shared by the
//! pipelines in [`crate::practice`].

pub mod agent;
pub mod error;
pub mod model;
pub mod structured;
pub mod tool;
