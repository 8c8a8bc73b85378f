// SPDX-License-Identifier: MIT

//! Typed error handling for agent-practice
//!
//! `PracticeError` is the single error type returned across the crate.
//! Executor failures are grouped under [`WorkflowError`] and LLM provider
//! failures under [`ModelError`].

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T, E = PracticeError> = std::result::Result<T, E>;

/// Top-level error type for agent-practice
#[derive(Debug, Error)]
pub enum PracticeError {
    /// API errors from external services (OpenAI, Tavily, Yahoo Finance, etc.)
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Tool not found in the registry
    #[error("Tool '{name}' not found")]
    ToolNotFound { name: String },

    /// Configuration errors (missing env vars, invalid settings file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rejected before any step ran
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Every search in a fan-out round came back empty
    #[error("No content found: {0}")]
    NoContent(String),

    /// Workflow executor errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// LLM provider errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Max iterations/turns reached
    #[error("Max {kind} reached: {limit}")]
    MaxIterations { kind: String, limit: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Workflow executor errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Two nodes registered under the same id
    #[error("Duplicate step: {0}")]
    DuplicateStep(String),

    /// START or END used as a node id
    #[error("Reserved step name: {0}")]
    ReservedName(String),

    /// An edge refers to a node that was never added
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// No edge leaves START
    #[error("Graph has no entry edge from START")]
    MissingEntry,

    /// A node has no way forward
    #[error("Step '{0}' has no outgoing edge")]
    NoOutgoingEdge(String),

    /// More than one routed edge set declared for the same node
    #[error("Step '{0}' already has conditional edges")]
    DuplicateRoute(String),

    /// The routing field was absent or not a string after the step ran
    #[error("Step '{step}' did not produce routing field '{field}'")]
    MissingRouteField { step: String, field: String },

    /// The routing field held a value with no mapped destination
    #[error("Step '{step}' routed to unknown destination '{value}'")]
    UnknownRoute { step: String, value: String },

    /// Parallel steps wrote to the same field (or the same sub-key of a merged field)
    #[error("Conflicting updates to '{field}' from steps {steps:?}")]
    ConflictingUpdate { field: String, steps: Vec<String> },

    /// A state field was read before any step produced it
    #[error("State field '{0}' has not been written yet")]
    MissingField(String),

    /// Triggers are pending but no node can run
    #[error("Graph stalled with pending steps: {0:?}")]
    Stalled(Vec<String>),

    /// Superstep ceiling exceeded
    #[error("Recursion limit of {0} supersteps reached")]
    RecursionLimit(u32),

    /// A step raised; the run is aborted
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<PracticeError>,
    },
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Provider not supported
    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Structured output did not match the requested schema
    #[error("Response does not match schema '{schema}': {message}")]
    SchemaViolation { schema: String, message: String },
}

impl PracticeError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// The innermost error, looking through `StepFailed` wrappers
    pub fn root(&self) -> &PracticeError {
        match self {
            Self::Workflow(WorkflowError::StepFailed { source, .. }) => source.root(),
            other => other,
        }
    }
}

impl From<&str> for PracticeError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for PracticeError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
