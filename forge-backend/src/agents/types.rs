//! Agent domain types: the registry entries, the unit of dispatch, and the
//! per-sub-task result shapes.

use crate::tools::ToolErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A registered agent: a display name unique within the registry and a
/// capability tag used for routing ("scene-builder", "asset-generator").
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub role: String,
}

impl Agent {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self { name: name.into(), role: role.into() }
    }
}

/// One tool invocation requested by an agent's LLM reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub params: Value,
}

/// The unit of dispatch: one agent's slice of the plan. Created by the
/// orchestrator after planning, owned by the dispatcher while executing,
/// discarded after its result is folded into the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    /// Unique identifier (UUID)
    pub id: String,
    /// The agent that owns this sub-task
    pub agent: Agent,
    /// What the agent is asked to achieve
    pub objective: String,
    /// Ordered constraints/parameters derived from the plan
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Artifact ids this sub-task builds on
    #[serde(default)]
    pub prior_artifacts: Vec<String>,
    /// Optional image attachments (data URLs or URLs)
    #[serde(default)]
    pub images: Vec<String>,
    /// Plan-level approval tag
    #[serde(default)]
    pub requires_approval: bool,
    /// Tools the plan expects this sub-task to use; matched against the
    /// destructive-tool policy
    #[serde(default)]
    pub planned_tools: Vec<String>,
    /// Set by the orchestrator when the approval gate denies this sub-task.
    /// The executor short-circuits without issuing any tool call.
    #[serde(default)]
    pub approval_denied: bool,
}

impl SubTask {
    pub fn new(agent: Agent, objective: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent,
            objective: objective.into(),
            constraints: Vec::new(),
            prior_artifacts: Vec::new(),
            images: Vec::new(),
            requires_approval: false,
            planned_tools: Vec::new(),
            approval_denied: false,
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<String>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_planned_tools(mut self, tools: Vec<String>) -> Self {
        self.planned_tools = tools;
        self
    }

    pub fn with_approval_required(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    /// Short ID for log lines (first 8 chars)
    pub fn short_id(&self) -> &str {
        &self.id[..8.min(self.id.len())]
    }

    /// The context string handed to the LLM collaborator: objective,
    /// constraints, and the artifacts this sub-task depends on.
    pub fn context_prompt(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!("## Objective\n\n{}\n", self.objective));

        if !self.constraints.is_empty() {
            prompt.push_str("\n## Constraints\n\n");
            for constraint in &self.constraints {
                prompt.push_str(&format!("- {}\n", constraint));
            }
        }

        if !self.prior_artifacts.is_empty() {
            prompt.push_str("\n## Existing artifacts\n\n");
            for artifact in &self.prior_artifacts {
                prompt.push_str(&format!("- {}\n", artifact));
            }
        }

        prompt
    }
}

/// Terminal outcome of one sub-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskOutcome {
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for SubTaskOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubTaskOutcome::Completed => write!(f, "completed"),
            SubTaskOutcome::Failed => write!(f, "failed"),
            SubTaskOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one sub-task, index-correlated with submission order by the
/// dispatcher. Every dispatched sub-task produces exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTaskResult {
    pub task_id: String,
    pub agent: String,
    pub outcome: SubTaskOutcome,
    /// Produced artifact ids, in production order
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Direct textual answer or final tool message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Failure description when the outcome is not `Completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error code surfaced from a non-retryable tool error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ToolErrorCode>,
    pub duration_ms: u64,
}

impl SubTaskResult {
    pub fn completed(
        task: &SubTask,
        artifacts: Vec<String>,
        summary: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            agent: task.agent.name.clone(),
            outcome: SubTaskOutcome::Completed,
            artifacts,
            summary,
            error: None,
            error_code: None,
            duration_ms,
        }
    }

    pub fn failed(
        task: &SubTask,
        error: impl Into<String>,
        error_code: Option<ToolErrorCode>,
        duration_ms: u64,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            agent: task.agent.name.clone(),
            outcome: SubTaskOutcome::Failed,
            artifacts: Vec::new(),
            summary: None,
            error: Some(error.into()),
            error_code,
            duration_ms,
        }
    }

    pub fn cancelled(task: &SubTask) -> Self {
        Self {
            task_id: task.id.clone(),
            agent: task.agent.name.clone(),
            outcome: SubTaskOutcome::Cancelled,
            artifacts: Vec::new(),
            summary: None,
            error: Some("cancelled before completion".to_string()),
            error_code: None,
            duration_ms: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == SubTaskOutcome::Completed
    }
}
