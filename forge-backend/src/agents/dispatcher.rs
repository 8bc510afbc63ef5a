//! Parallel dispatcher: bounded fan-out of sub-tasks.
//!
//! At most `max_parallel` sub-tasks execute concurrently; queued sub-tasks
//! wait on a semaphore permit. Results come back in submission order so
//! index `i` of the returned list always belongs to sub-task `i`, no matter
//! which finished first. On cancellation, sub-tasks that never obtained a
//! permit report `Cancelled`; in-flight ones abort through the executor's
//! own cancellation checks.

use crate::agents::executor::AgentExecutor;
use crate::agents::types::{SubTask, SubTaskResult};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub struct Dispatcher {
    executor: Arc<AgentExecutor>,
    max_parallel: usize,
}

impl Dispatcher {
    pub fn new(executor: Arc<AgentExecutor>, max_parallel: usize) -> Self {
        Self {
            executor,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Run all sub-tasks, returning one result per sub-task in submission
    /// order. Every sub-task is accounted for: completed, failed, cancelled,
    /// or (if its task panicked) folded into a failure result.
    pub async fn dispatch(
        &self,
        tasks: Vec<SubTask>,
        cancel: &CancellationToken,
    ) -> Vec<SubTaskResult> {
        log::info!(
            "[DISPATCH] Running {} sub-task(s), max {} in parallel",
            tasks.len(),
            self.max_parallel
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let executor = self.executor.clone();
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    // Wait for an execution slot, unless cancellation wins
                    // first: tasks that never started come back Cancelled.
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => None,
                        permit = semaphore.acquire_owned() => permit.ok(),
                    };

                    match permit {
                        Some(_permit) => executor.run(&task, &cancel).await,
                        None => {
                            log::debug!(
                                "[DISPATCH] Sub-task {} cancelled before start",
                                task.short_id()
                            );
                            SubTaskResult::cancelled(&task)
                        }
                    }
                })
            })
            .collect();

        // Join in submission order; a panicked sub-task becomes a failure
        // entry instead of disappearing from the report.
        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    log::error!("[DISPATCH] Sub-task panicked: {}", e);
                    SubTaskResult {
                        task_id: String::new(),
                        agent: String::new(),
                        outcome: crate::agents::types::SubTaskOutcome::Failed,
                        artifacts: Vec::new(),
                        summary: None,
                        error: Some(format!("sub-task panicked: {}", e)),
                        error_code: None,
                        duration_ms: 0,
                    }
                })
            })
            .collect()
    }
}
