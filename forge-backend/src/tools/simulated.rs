//! Simulated engine backend.
//!
//! An in-memory stand-in for the real engine bridge: scenes, scripts, and
//! generated assets live in a shared resource map. The harness binary and
//! the scenario tests run against this backend through the same
//! [`ToolRegistry`] a production bridge would use.

use crate::error::RegistryError;
use crate::tools::registry::{Tool, ToolRegistry};
use crate::tools::types::{ToolErrorCode, ToolId, ToolResult};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// Shared in-memory project state.
#[derive(Default)]
pub struct SimulatedEngine {
    /// Resource path/id → resource description
    resources: DashMap<String, Value>,
}

impl SimulatedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn has_resource(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    fn short_uid() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }
}

/// Build a registry with every simulated tool registered.
pub fn create_simulated_registry(engine: Arc<SimulatedEngine>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_simulated_tools(&mut registry, engine)
        .expect("simulated tool ids are distinct by construction");
    registry
}

fn register_simulated_tools(
    registry: &mut ToolRegistry,
    engine: Arc<SimulatedEngine>,
) -> Result<(), RegistryError> {
    registry.register(Arc::new(CreateSceneTool { engine: engine.clone() }))?;
    registry.register(Arc::new(EditSceneTool { engine: engine.clone() }))?;
    registry.register(Arc::new(EditScriptTool { engine: engine.clone() }))?;
    registry.register(Arc::new(GenerateSpriteTool { engine: engine.clone() }))?;
    registry.register(Arc::new(GenerateAnimationTool { engine: engine.clone() }))?;
    registry.register(Arc::new(DeleteResourceTool { engine }))?;
    Ok(())
}

// =============================================================================
// Scene tools
// =============================================================================

pub struct CreateSceneTool {
    engine: Arc<SimulatedEngine>,
}

#[derive(Deserialize)]
struct CreateSceneParams {
    name: String,
    #[serde(default)]
    root_type: Option<String>,
}

#[async_trait]
impl Tool for CreateSceneTool {
    fn id(&self) -> ToolId {
        ToolId::CreateScene
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: CreateSceneParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::error(
                    ToolErrorCode::InvalidParams,
                    format!("invalid create_scene parameters: {}", e),
                );
            }
        };
        if params.name.is_empty() {
            return ToolResult::error(ToolErrorCode::InvalidParams, "scene name is empty");
        }

        let path = format!("res://scenes/{}.tscn", params.name);
        if self.engine.resources.contains_key(&path) {
            // Recoverable: the agent can retry with a different name
            return ToolResult::failure(format!("scene '{}' already exists", path));
        }

        let root = params.root_type.unwrap_or_else(|| "Node2D".to_string());
        self.engine
            .resources
            .insert(path.clone(), json!({"kind": "scene", "root": root, "nodes": []}));

        ToolResult::success(
            json!({"artifact": path, "root": root}),
            format!("created scene '{}'", params.name),
        )
    }
}

pub struct EditSceneTool {
    engine: Arc<SimulatedEngine>,
}

#[derive(Deserialize)]
struct EditSceneParams {
    scene: String,
    #[serde(default)]
    add_nodes: Vec<String>,
}

#[async_trait]
impl Tool for EditSceneTool {
    fn id(&self) -> ToolId {
        ToolId::EditScene
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: EditSceneParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::error(
                    ToolErrorCode::InvalidParams,
                    format!("invalid edit_scene parameters: {}", e),
                );
            }
        };

        let Some(mut entry) = self.engine.resources.get_mut(&params.scene) else {
            return ToolResult::error(
                ToolErrorCode::ResourceMissing,
                format!("scene '{}' does not exist", params.scene),
            );
        };
        if let Some(nodes) = entry.get_mut("nodes").and_then(|n| n.as_array_mut()) {
            nodes.extend(params.add_nodes.iter().map(|n| json!(n)));
        }

        ToolResult::success(
            json!({"artifact": params.scene, "added": params.add_nodes.len()}),
            format!("updated scene '{}'", params.scene),
        )
    }
}

// =============================================================================
// Script tool
// =============================================================================

pub struct EditScriptTool {
    engine: Arc<SimulatedEngine>,
}

#[derive(Deserialize)]
struct EditScriptParams {
    path: String,
    source: String,
}

#[async_trait]
impl Tool for EditScriptTool {
    fn id(&self) -> ToolId {
        ToolId::EditScript
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: EditScriptParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::error(
                    ToolErrorCode::InvalidParams,
                    format!("invalid edit_script parameters: {}", e),
                );
            }
        };
        if params.source.is_empty() {
            return ToolResult::failure("script source is empty, nothing to write");
        }

        self.engine.resources.insert(
            params.path.clone(),
            json!({"kind": "script", "lines": params.source.lines().count()}),
        );

        ToolResult::success(
            json!({"artifact": params.path}),
            format!("wrote script '{}'", params.path),
        )
    }
}

// =============================================================================
// Asset tools
// =============================================================================

pub struct GenerateSpriteTool {
    engine: Arc<SimulatedEngine>,
}

#[derive(Deserialize)]
struct GenerateSpriteParams {
    subject: String,
    #[serde(default)]
    size: Option<u32>,
}

#[async_trait]
impl Tool for GenerateSpriteTool {
    fn id(&self) -> ToolId {
        ToolId::GenerateSprite
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: GenerateSpriteParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::error(
                    ToolErrorCode::InvalidParams,
                    format!("invalid generate_sprite parameters: {}", e),
                );
            }
        };

        let id = format!("{}-{}", params.subject, SimulatedEngine::short_uid());
        let size = params.size.unwrap_or(32);
        self.engine
            .resources
            .insert(id.clone(), json!({"kind": "sprite", "subject": params.subject, "size": size}));

        ToolResult::success(
            json!({"artifact": id, "size": size}),
            format!("generated {}x{} sprite for '{}'", size, size, params.subject),
        )
    }
}

pub struct GenerateAnimationTool {
    engine: Arc<SimulatedEngine>,
}

#[derive(Deserialize)]
struct GenerateAnimationParams {
    sprite: String,
    animation: String,
    #[serde(default)]
    frames: Option<u32>,
}

#[async_trait]
impl Tool for GenerateAnimationTool {
    fn id(&self) -> ToolId {
        ToolId::GenerateAnimation
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: GenerateAnimationParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::error(
                    ToolErrorCode::InvalidParams,
                    format!("invalid generate_animation parameters: {}", e),
                );
            }
        };

        if !self.engine.resources.contains_key(&params.sprite) {
            return ToolResult::error(
                ToolErrorCode::ResourceMissing,
                format!("sprite '{}' does not exist", params.sprite),
            );
        }

        let id = format!("{}-{}", params.sprite, params.animation);
        let frames = params.frames.unwrap_or(8);
        self.engine
            .resources
            .insert(id.clone(), json!({"kind": "animation", "frames": frames}));

        ToolResult::success(
            json!({"artifact": id, "frames": frames}),
            format!("generated animation '{}' ({} frames)", id, frames),
        )
    }
}

// =============================================================================
// Destructive tool
// =============================================================================

pub struct DeleteResourceTool {
    engine: Arc<SimulatedEngine>,
}

#[derive(Deserialize)]
struct DeleteResourceParams {
    id: String,
}

#[async_trait]
impl Tool for DeleteResourceTool {
    fn id(&self) -> ToolId {
        ToolId::DeleteResource
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let params: DeleteResourceParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::error(
                    ToolErrorCode::InvalidParams,
                    format!("invalid delete_resource parameters: {}", e),
                );
            }
        };

        match self.engine.resources.remove(&params.id) {
            Some(_) => ToolResult::success(
                json!({"deleted": params.id}),
                format!("deleted '{}'", params.id),
            ),
            None => ToolResult::error(
                ToolErrorCode::ResourceMissing,
                format!("resource '{}' does not exist", params.id),
            ),
        }
    }
}
