//! Configuration for the orchestration core and the harness binary.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Orchestrator behavior knobs. Construction-time only; the orchestrator
/// never re-reads configuration mid-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// If false, `process_request` fails immediately with `Disabled`
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum sub-tasks executing concurrently
    #[serde(default = "default_max_parallel")]
    pub max_parallel_agents: usize,
    /// Timeout for each LLM collaborator call, in seconds
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,
    /// Timeout for each tool collaborator call, in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    /// When true, a single approval denial aborts the whole request instead
    /// of failing only the denied sub-task
    #[serde(default)]
    pub fail_request_on_denial: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_parallel() -> usize {
    4
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_tool_timeout() -> u64 {
    120
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_parallel_agents: default_max_parallel(),
            llm_timeout_secs: default_llm_timeout(),
            tool_timeout_secs: default_tool_timeout(),
            fail_request_on_denial: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Process-level configuration for the harness binary.
#[derive(Clone)]
pub struct Config {
    pub llm_endpoint: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub max_tokens: u32,
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            llm_endpoint: env::var("FORGE_LLM_ENDPOINT")
                .expect("FORGE_LLM_ENDPOINT must be set"),
            llm_api_key: env::var("FORGE_LLM_API_KEY").ok(),
            llm_model: env::var("FORGE_LLM_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_tokens: env::var("FORGE_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096),
            orchestrator: OrchestratorConfig {
                enabled: env::var("FORGE_ENABLED")
                    .map(|v| v != "0" && v.to_lowercase() != "false")
                    .unwrap_or(true),
                max_parallel_agents: env::var("FORGE_MAX_PARALLEL_AGENTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|&n| n > 0)
                    .unwrap_or_else(default_max_parallel),
                llm_timeout_secs: env::var("FORGE_LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_llm_timeout),
                tool_timeout_secs: env::var("FORGE_TOOL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_tool_timeout),
                fail_request_on_denial: env::var("FORGE_FAIL_ON_DENIAL")
                    .map(|v| v == "1" || v.to_lowercase() == "true")
                    .unwrap_or(false),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_parallel_agents, 4);
        assert_eq!(config.llm_timeout(), Duration::from_secs(60));
        assert_eq!(config.tool_timeout(), Duration::from_secs(120));
        assert!(!config.fail_request_on_denial);
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_parallel_agents, 4);

        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"max_parallel_agents": 2, "enabled": false}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.max_parallel_agents, 2);
        assert_eq!(config.llm_timeout_secs, 60);
    }
}
