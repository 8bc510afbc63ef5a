//! LLM collaborator abstraction.
//!
//! The core sends accumulated context (plus optional images) and awaits one
//! complete text response; no streaming, no provider specifics. A concrete
//! OpenAI-compatible client lives in [`openai`].

pub mod openai;

pub use openai::OpenAIClient;

use crate::error::LlmError;
use async_trait::async_trait;

/// The LLM collaborator contract. `images` entries are data URLs or plain
/// URLs, passed through untouched. Failures are surfaced to the caller
/// immediately; the core never retries an LLM call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn send(&self, context: &str, images: &[String]) -> Result<String, LlmError>;
}

/// Models routinely wrap JSON in markdown fences. Strip one outer fence
/// (with or without a language tag) if present.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop a language tag on the opening fence line
    match body.split_once('\n') {
        Some((first, tail)) if !first.trim_start().starts_with(['{', '[']) => tail.trim(),
        _ => body.trim(),
    }
}
