//! Approval gate: the narrow human-in-the-loop checkpoint.
//!
//! The orchestrator asks once per gated sub-task before dispatch. A denial
//! fails only that sub-task (zero tool calls) unless the orchestrator's
//! `fail_request_on_denial` policy is set.

use crate::agents::SubTask;
use crate::tools::ToolId;
use async_trait::async_trait;

/// The approval collaborator contract. The call suspends the issuing
/// request until answered; `true` approves, `false` denies.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn request_approval(&self, operation: &str, details: &str) -> bool;
}

/// A sub-task is gated when the plan tags it, or when any tool the plan
/// expects it to use is destructive.
pub fn needs_approval(task: &SubTask) -> bool {
    if task.requires_approval {
        return true;
    }
    task.planned_tools
        .iter()
        .any(|name| ToolId::from_str(name).is_some_and(|id| id.is_destructive()))
}

/// Approves everything. Suitable for non-interactive runs where no
/// destructive tools are registered.
pub struct AutoApprove;

#[async_trait]
impl ApprovalGate for AutoApprove {
    async fn request_approval(&self, operation: &str, _details: &str) -> bool {
        log::debug!("[APPROVAL] Auto-approving '{}'", operation);
        true
    }
}

/// Denies everything. The safe default when no human is wired up.
pub struct AutoDeny;

#[async_trait]
impl ApprovalGate for AutoDeny {
    async fn request_approval(&self, operation: &str, _details: &str) -> bool {
        log::warn!("[APPROVAL] Denying '{}' (no approver configured)", operation);
        false
    }
}
