//! Tool trait and the name → handler registry.

use crate::error::RegistryError;
use crate::tools::types::{ToolErrorCode, ToolId, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A single executable tool. Implementations live behind the engine bridge
/// (or the simulated engine); the core only sees this trait.
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> ToolId;

    async fn execute(&self, params: Value) -> ToolResult;
}

/// The tool collaborator contract consumed by the agent executor: execute a
/// named tool with parameters, get a structured result. Must be safe to
/// retry once per the executor's retry policy.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn execute_tool(&self, name: &str, params: Value) -> ToolResult;
}

/// Registry mapping tool identifiers to handlers. Populated at system
/// construction; read-only during request processing.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolId, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool handler. Duplicate identifiers fail fast.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let id = tool.id();
        if self.tools.contains_key(&id) {
            return Err(RegistryError::DuplicateTool(id.as_str().to_string()));
        }
        log::debug!("[TOOLS] Registered '{}'", id);
        self.tools.insert(id, tool);
        Ok(())
    }

    pub fn get(&self, id: ToolId) -> Option<Arc<dyn Tool>> {
        self.tools.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolBackend for ToolRegistry {
    async fn execute_tool(&self, name: &str, params: Value) -> ToolResult {
        let Some(id) = ToolId::from_str(name) else {
            return ToolResult::error(
                ToolErrorCode::UnknownTool,
                format!("'{}' is not a known tool", name),
            );
        };
        let Some(tool) = self.get(id) else {
            return ToolResult::error(
                ToolErrorCode::UnknownTool,
                format!("tool '{}' has no registered handler", name),
            );
        };
        log::debug!("[TOOLS] Executing '{}'", name);
        tool.execute(params).await
    }
}
