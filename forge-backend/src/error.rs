//! Error taxonomy for the orchestration core.
//!
//! Sub-task level failures (tool failures, approval denials, cancellation)
//! are data, not errors: they fold into the [`crate::RequestReport`]. Only
//! fast-reject conditions surface as `Err` from `process_request`.

use thiserror::Error;

/// Immediate rejections from [`crate::Orchestrator::process_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// The system was constructed with `enabled = false`
    #[error("orchestrator is disabled")]
    Disabled,

    /// A request is already being processed
    #[error("orchestrator is busy processing another request")]
    Busy,

    /// `shutdown()` was called; no further requests are accepted
    #[error("orchestrator is shutting down")]
    ShuttingDown,
}

/// Construction-time registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An agent with this name already exists
    #[error("agent '{0}' is already registered")]
    DuplicateAgent(String),

    /// A tool with this identifier already exists
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
}

/// Failures of the LLM collaborator. Never retried by the executor; a
/// planning-time failure fails the request, an execution-time failure fails
/// that sub-task.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Endpoint did not parse as an HTTP(S) URL
    #[error("invalid LLM endpoint '{0}'")]
    InvalidEndpoint(String),

    /// Transport-level failure
    #[error("LLM request failed: {0}")]
    Http(String),

    /// Non-success response from the provider
    #[error("LLM API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The call exceeded the configured timeout
    #[error("LLM call timed out")]
    Timeout,

    /// Response body did not contain a usable completion
    #[error("unexpected LLM response: {0}")]
    InvalidResponse(String),
}
