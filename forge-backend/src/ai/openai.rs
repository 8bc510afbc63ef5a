//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint speaking the `/chat/completions` shape
//! (OpenAI, Moonshot, Ollama, vLLM, ...). One request per `send` call, no
//! streaming.

use crate::ai::LlmClient;
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

/// Content is either a plain string or an array of vision parts, so the one
/// struct covers both text-only and image-carrying requests.
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAIClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl OpenAIClient {
    /// `endpoint` is the full chat-completions URL. The timeout applies to
    /// the whole request; expiry maps to [`LlmError::Timeout`].
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let endpoint = endpoint.into();
        let parsed = url::Url::parse(&endpoint)
            .map_err(|_| LlmError::InvalidEndpoint(endpoint.clone()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(LlmError::InvalidEndpoint(endpoint));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            model: model.into(),
            max_tokens,
        })
    }

    fn build_messages(&self, context: &str, images: &[String]) -> Vec<ChatMessage> {
        let content = if images.is_empty() {
            Value::String(context.to_string())
        } else {
            let mut parts = vec![json!({"type": "text", "text": context})];
            parts.extend(
                images
                    .iter()
                    .map(|img| json!({"type": "image_url", "image_url": {"url": img}})),
            );
            Value::Array(parts)
        };
        vec![ChatMessage { role: "user".to_string(), content }]
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn send(&self, context: &str, images: &[String]) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: self.build_messages(context, images),
            max_tokens: self.max_tokens,
        };

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), message: body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no completion content".to_string()))
    }
}
