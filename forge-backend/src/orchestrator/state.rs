//! Orchestrator lifecycle states and the legal transition table.

use serde::{Deserialize, Serialize};

/// Exactly one state is active at a time. `Completed` and `Failed` are
/// terminal for a request (the orchestrator then returns to `Idle`);
/// `ShuttingDown` is terminal for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Planning,
    AwaitingApproval,
    Dispatching,
    Aggregating,
    Completed,
    Failed,
    ShuttingDown,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        OrchestratorState::Idle
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorState::Idle => write!(f, "idle"),
            OrchestratorState::Planning => write!(f, "planning"),
            OrchestratorState::AwaitingApproval => write!(f, "awaiting_approval"),
            OrchestratorState::Dispatching => write!(f, "dispatching"),
            OrchestratorState::Aggregating => write!(f, "aggregating"),
            OrchestratorState::Completed => write!(f, "completed"),
            OrchestratorState::Failed => write!(f, "failed"),
            OrchestratorState::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

impl OrchestratorState {
    /// Human-readable label for progress output
    pub fn label(&self) -> &'static str {
        match self {
            OrchestratorState::Idle => "Idle",
            OrchestratorState::Planning => "Planning",
            OrchestratorState::AwaitingApproval => "Awaiting approval",
            OrchestratorState::Dispatching => "Dispatching",
            OrchestratorState::Aggregating => "Aggregating",
            OrchestratorState::Completed => "Completed",
            OrchestratorState::Failed => "Failed",
            OrchestratorState::ShuttingDown => "Shutting down",
        }
    }

    /// Terminal for the current request
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestratorState::Completed
                | OrchestratorState::Failed
                | OrchestratorState::ShuttingDown
        )
    }

    /// The legal transition table. `ShuttingDown` is reachable from every
    /// state and leads nowhere.
    pub fn can_transition(&self, to: OrchestratorState) -> bool {
        use OrchestratorState::*;

        if *self == ShuttingDown {
            return false;
        }
        if to == ShuttingDown {
            return true;
        }
        matches!(
            (*self, to),
            (Idle, Planning)
                | (Planning, AwaitingApproval)
                | (Planning, Dispatching)
                | (Planning, Failed)
                | (AwaitingApproval, Dispatching)
                | (AwaitingApproval, Failed)
                | (Dispatching, Aggregating)
                | (Aggregating, Completed)
                | (Completed, Idle)
                | (Failed, Idle)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrchestratorState::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Idle.can_transition(Planning));
        assert!(Planning.can_transition(AwaitingApproval));
        assert!(Planning.can_transition(Dispatching)); // no gated sub-tasks
        assert!(AwaitingApproval.can_transition(Dispatching));
        assert!(Dispatching.can_transition(Aggregating));
        assert!(Aggregating.can_transition(Completed));
        assert!(Completed.can_transition(Idle));
    }

    #[test]
    fn test_failure_transitions() {
        assert!(Planning.can_transition(Failed));
        assert!(AwaitingApproval.can_transition(Failed));
        assert!(Failed.can_transition(Idle));
        assert!(!Dispatching.can_transition(Failed));
    }

    #[test]
    fn test_shutdown_is_reachable_from_everywhere_and_final() {
        for state in [Idle, Planning, AwaitingApproval, Dispatching, Aggregating, Completed, Failed]
        {
            assert!(state.can_transition(ShuttingDown));
        }
        assert!(!ShuttingDown.can_transition(Idle));
        assert!(!ShuttingDown.can_transition(Planning));
        assert!(!ShuttingDown.can_transition(ShuttingDown));
    }

    #[test]
    fn test_terminal_states() {
        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(ShuttingDown.is_terminal());
        assert!(!Idle.is_terminal());
        assert!(!Dispatching.is_terminal());
    }

    #[test]
    fn test_illegal_jumps_rejected() {
        assert!(!Idle.can_transition(Dispatching));
        assert!(!Planning.can_transition(Completed));
        assert!(!Aggregating.can_transition(Idle));
        assert!(!Dispatching.can_transition(Idle));
    }

    #[test]
    fn test_display_and_serde_agree() {
        let json = serde_json::to_string(&AwaitingApproval).unwrap();
        assert_eq!(json, "\"awaiting_approval\"");
        assert_eq!(AwaitingApproval.to_string(), "awaiting_approval");
        assert_eq!(ShuttingDown.label(), "Shutting down");
    }
}
