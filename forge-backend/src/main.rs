//! Forge harness binary.
//!
//! Runs one request end-to-end against an OpenAI-compatible endpoint and
//! the simulated engine backend, with console approval for gated
//! operations.
//!
//! Usage:
//!   FORGE_QUERY="Create a platformer with a knight character" \
//!   FORGE_LLM_ENDPOINT="https://api.openai.com/v1/chat/completions" \
//!   FORGE_LLM_API_KEY="your-api-key" \
//!   FORGE_LLM_MODEL="gpt-4o-mini" \
//!   cargo run

use async_trait::async_trait;
use dotenv::dotenv;
use std::io::Write;
use std::sync::Arc;

use forge_backend::agents::AgentRegistry;
use forge_backend::ai::OpenAIClient;
use forge_backend::approval::ApprovalGate;
use forge_backend::config::Config;
use forge_backend::orchestrator::Orchestrator;
use forge_backend::progress::LogProgress;
use forge_backend::tools::{SimulatedEngine, create_simulated_registry};

/// Blocking y/n prompt on the controlling terminal.
struct ConsoleApproval;

#[async_trait]
impl ApprovalGate for ConsoleApproval {
    async fn request_approval(&self, operation: &str, details: &str) -> bool {
        let operation = operation.to_string();
        let details = details.to_string();

        let answer = tokio::task::spawn_blocking(move || {
            print!("Approve '{}' ({})? [y/N] ", operation, details);
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return false;
            }
            matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
        })
        .await;

        answer.unwrap_or(false)
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let query = std::env::var("FORGE_QUERY")
        .unwrap_or_else(|_| "Create a platformer with a knight character".to_string());

    log::info!("Initializing simulated engine");
    let engine = SimulatedEngine::new();
    let tools = Arc::new(create_simulated_registry(engine.clone()));

    log::info!("Initializing agent roster");
    let registry = AgentRegistry::with_defaults();
    log::info!("Registered {} agents", registry.len());

    log::info!("Connecting LLM client to {}", config.llm_endpoint);
    let llm = match OpenAIClient::new(
        &config.llm_endpoint,
        config.llm_api_key.clone(),
        &config.llm_model,
        config.max_tokens,
        config.orchestrator.llm_timeout(),
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::error!("Failed to build LLM client: {}", e);
            std::process::exit(1);
        }
    };

    let orchestrator = Orchestrator::new(
        config.orchestrator.clone(),
        registry,
        llm,
        tools,
        Arc::new(ConsoleApproval),
        Arc::new(LogProgress),
    );

    log::info!("Processing request: {}", query);
    match orchestrator.process_request(&query).await {
        Ok(report) => {
            log::info!(
                "Request finished: success={}, {} resource(s) in project",
                report.success,
                engine.resource_count()
            );
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => log::error!("Failed to serialize report: {}", e),
            }
            if !report.success {
                std::process::exit(1);
            }
        }
        Err(e) => {
            log::error!("Request rejected: {}", e);
            std::process::exit(1);
        }
    }
}
