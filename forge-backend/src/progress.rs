//! Progress collaborator: fire-and-forget notifications emitted at step
//! boundaries. No ordering guarantee beyond causal order of emission.

pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, message: &str);
}

/// Emits progress through the log facade.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, message: &str) {
        log::info!("[PROGRESS] {}", message);
    }
}

/// Swallows progress. Used where nobody is listening.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _message: &str) {}
}
