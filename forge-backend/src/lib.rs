//! Multi-agent orchestration core for the Forge game-building assistant.
//!
//! One high-level user request ("build a platformer with a knight character")
//! is planned into agent sub-tasks, gated through human approval where risky,
//! executed with bounded concurrency against an abstract tool backend, and
//! folded into a single [`RequestReport`].
//!
//! The core only talks to collaborators through traits: [`ai::LlmClient`] for
//! the language model, [`tools::ToolBackend`] for tool execution,
//! [`progress::ProgressSink`] for notifications, and
//! [`approval::ApprovalGate`] for human sign-off. Concrete backends (an
//! OpenAI-compatible client, a simulated engine) are provided for the
//! harness binary and tests.

pub mod agents;
pub mod ai;
pub mod approval;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod tools;

pub use agents::{Agent, AgentRegistry, SubTask, SubTaskOutcome, SubTaskResult};
pub use approval::{ApprovalGate, AutoApprove, AutoDeny};
pub use config::{Config, OrchestratorConfig};
pub use error::{LlmError, OrchestratorError, RegistryError};
pub use orchestrator::{Orchestrator, OrchestratorState, RequestReport};
pub use progress::{LogProgress, NullProgress, ProgressSink};
pub use tools::{Tool, ToolBackend, ToolErrorCode, ToolId, ToolRegistry, ToolResult};
