//! Agent executor: runs one agent's slice of work for one sub-task.
//!
//! The bounded sequence per sub-task is: build context → one LLM call →
//! execute each requested tool → report. A recoverable tool `Failure` earns
//! exactly one immediate retry; an `Error` code stops the sub-task on the
//! spot; an LLM failure is never retried. Cancellation is checked between
//! steps so a shut-down executor reports `Cancelled`, never a partial
//! success.

use crate::agents::types::{SubTask, SubTaskResult, ToolRequest};
use crate::ai::{LlmClient, strip_code_fences};
use crate::config::OrchestratorConfig;
use crate::progress::ProgressSink;
use crate::tools::{ToolBackend, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Reply contract appended to every sub-task context.
const REPLY_GUIDE: &str = r#"
## Response format

Respond with a single JSON object, either a direct answer:

    {"answer": "..."}

or one or more tool invocations:

    {"tool_calls": [{"tool": "create_scene", "params": {"name": "Game"}}]}

Available tools: create_scene, edit_scene, edit_script, generate_sprite,
generate_animation, delete_resource.
"#;

/// What the agent's LLM reply asked for.
#[derive(Debug, PartialEq)]
pub enum Directive {
    Answer(String),
    ToolCalls(Vec<ToolRequest>),
}

#[derive(Deserialize)]
struct RawDirective {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolRequest>,
}

/// Parse an LLM reply into a [`Directive`]. Anything that is not a JSON
/// directive is taken as a direct textual answer.
pub fn parse_directive(reply: &str) -> Directive {
    let stripped = strip_code_fences(reply);
    if let Ok(raw) = serde_json::from_str::<RawDirective>(stripped) {
        if !raw.tool_calls.is_empty() {
            return Directive::ToolCalls(raw.tool_calls);
        }
        if let Some(answer) = raw.answer {
            return Directive::Answer(answer);
        }
    }
    Directive::Answer(reply.trim().to_string())
}

pub struct AgentExecutor {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolBackend>,
    progress: Arc<dyn ProgressSink>,
    llm_timeout: Duration,
    tool_timeout: Duration,
}

impl AgentExecutor {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolBackend>,
        progress: Arc<dyn ProgressSink>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            progress,
            llm_timeout: config.llm_timeout(),
            tool_timeout: config.tool_timeout(),
        }
    }

    /// Run one sub-task to a terminal result. Never panics outward; every
    /// path produces a `SubTaskResult`.
    pub async fn run(&self, task: &SubTask, cancel: &CancellationToken) -> SubTaskResult {
        let start = Instant::now();
        let agent = &task.agent.name;

        // A denied gate short-circuits before any collaborator is touched
        if task.approval_denied {
            self.progress
                .on_progress(&format!("[{}] sub-task blocked: approval denied", agent));
            return SubTaskResult::failed(task, "approval denied", None, elapsed_ms(start));
        }

        if cancel.is_cancelled() {
            return SubTaskResult::cancelled(task);
        }

        self.progress
            .on_progress(&format!("[{}] starting: {}", agent, task.objective));

        let mut context = format!(
            "You are '{}', the {} agent of a game-building assistant.\n\n{}",
            agent,
            task.agent.role,
            task.context_prompt()
        );
        context.push_str(REPLY_GUIDE);

        let reply = match timeout(self.llm_timeout, self.llm.send(&context, &task.images)).await {
            Err(_) => {
                return SubTaskResult::failed(task, "LLM call timed out", None, elapsed_ms(start));
            }
            Ok(Err(e)) => {
                log::warn!("[EXECUTOR] LLM call failed for '{}': {}", agent, e);
                return SubTaskResult::failed(
                    task,
                    format!("LLM call failed: {}", e),
                    None,
                    elapsed_ms(start),
                );
            }
            Ok(Ok(reply)) => reply,
        };

        if cancel.is_cancelled() {
            return SubTaskResult::cancelled(task);
        }

        let requests = match parse_directive(&reply) {
            Directive::Answer(answer) => {
                self.progress
                    .on_progress(&format!("[{}] answered directly", agent));
                return SubTaskResult::completed(
                    task,
                    Vec::new(),
                    Some(answer),
                    elapsed_ms(start),
                );
            }
            Directive::ToolCalls(requests) => requests,
        };

        self.progress.on_progress(&format!(
            "[{}] plan step requests {} tool call(s)",
            agent,
            requests.len()
        ));

        let mut artifacts = Vec::new();
        let mut last_message = None;

        for request in &requests {
            if cancel.is_cancelled() {
                return SubTaskResult::cancelled(task);
            }

            self.progress
                .on_progress(&format!("[{}] executing tool '{}'", agent, request.tool));

            let mut result = self.call_tool(request).await;

            if let ToolResult::Failure { message } = &result {
                // One immediate retry; the tool contract is idempotent-safe
                // for exactly this
                self.progress.on_progress(&format!(
                    "[{}] tool '{}' failed ({}), retrying once",
                    agent, request.tool, message
                ));
                log::debug!(
                    "[EXECUTOR] Retrying '{}' for '{}' after failure: {}",
                    request.tool,
                    agent,
                    message
                );
                result = self.call_tool(request).await;
            }

            match result {
                ToolResult::Success { .. } => {
                    artifacts.extend(result.artifacts());
                    last_message = Some(result.message().to_string());
                }
                ToolResult::Failure { message } => {
                    return SubTaskResult::failed(
                        task,
                        format!("tool '{}' failed after retry: {}", request.tool, message),
                        None,
                        elapsed_ms(start),
                    );
                }
                ToolResult::Error { code, message } => {
                    // Error codes are non-retryable; stop early
                    return SubTaskResult::failed(
                        task,
                        format!("tool '{}' error: {}", request.tool, message),
                        Some(code),
                        elapsed_ms(start),
                    );
                }
            }
        }

        self.progress.on_progress(&format!(
            "[{}] completed with {} artifact(s)",
            agent,
            artifacts.len()
        ));

        SubTaskResult::completed(task, artifacts, last_message, elapsed_ms(start))
    }

    /// One tool invocation with the configured timeout. Expiry is a
    /// recoverable `Failure`, so a timed-out first attempt still gets the
    /// single retry.
    async fn call_tool(&self, request: &ToolRequest) -> ToolResult {
        match timeout(
            self.tool_timeout,
            self.tools.execute_tool(&request.tool, request.params.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => ToolResult::failure(format!(
                "tool '{}' timed out after {}s",
                request.tool,
                self.tool_timeout.as_secs()
            )),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
