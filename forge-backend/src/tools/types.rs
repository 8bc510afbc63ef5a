//! Tool result model and the closed tool identifier set.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable error codes carried by `ToolResult::Error`. Closed set;
/// error-coded results are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorCode {
    /// Tool name not present in the registry
    UnknownTool,
    /// Parameters failed validation
    InvalidParams,
    /// A referenced resource does not exist
    ResourceMissing,
    /// The operation is not permitted
    PermissionDenied,
    /// The engine bridge failed internally
    EngineFailure,
}

impl ToolErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorCode::UnknownTool => "unknown_tool",
            ToolErrorCode::InvalidParams => "invalid_params",
            ToolErrorCode::ResourceMissing => "resource_missing",
            ToolErrorCode::PermissionDenied => "permission_denied",
            ToolErrorCode::EngineFailure => "engine_failure",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unknown_tool" => Some(ToolErrorCode::UnknownTool),
            "invalid_params" => Some(ToolErrorCode::InvalidParams),
            "resource_missing" => Some(ToolErrorCode::ResourceMissing),
            "permission_denied" => Some(ToolErrorCode::PermissionDenied),
            "engine_failure" => Some(ToolErrorCode::EngineFailure),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToolErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a single tool invocation. Exactly one variant is populated;
/// callers branch on the discriminant.
///
/// `Failure` is the expected, recoverable non-success (eligible for one
/// retry); `Error` carries a code and is never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success { data: Value, message: String },
    Failure { message: String },
    Error { code: ToolErrorCode, message: String },
}

impl ToolResult {
    pub fn success(data: Value, message: impl Into<String>) -> Self {
        ToolResult::Success { data, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ToolResult::Failure { message: message.into() }
    }

    pub fn error(code: ToolErrorCode, message: impl Into<String>) -> Self {
        ToolResult::Error { code, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// Human-readable message regardless of variant
    pub fn message(&self) -> &str {
        match self {
            ToolResult::Success { message, .. } => message,
            ToolResult::Failure { message } => message,
            ToolResult::Error { message, .. } => message,
        }
    }

    /// Artifact identifiers carried by a success payload. Tools report
    /// produced resources under `"artifact"` (single string) or
    /// `"artifacts"` (array of strings) in `data`.
    pub fn artifacts(&self) -> Vec<String> {
        let ToolResult::Success { data, .. } = self else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if let Some(one) = data.get("artifact").and_then(|v| v.as_str()) {
            out.push(one.to_string());
        }
        if let Some(many) = data.get("artifacts").and_then(|v| v.as_array()) {
            out.extend(many.iter().filter_map(|v| v.as_str().map(|s| s.to_string())));
        }
        out
    }
}

/// The closed set of tool identifiers the core can route to. Unknown names
/// fail fast at registration; at execution they come back as
/// `ToolErrorCode::UnknownTool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    CreateScene,
    EditScene,
    EditScript,
    GenerateSprite,
    GenerateAnimation,
    DeleteResource,
}

impl ToolId {
    pub fn all() -> Vec<ToolId> {
        vec![
            ToolId::CreateScene,
            ToolId::EditScene,
            ToolId::EditScript,
            ToolId::GenerateSprite,
            ToolId::GenerateAnimation,
            ToolId::DeleteResource,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::CreateScene => "create_scene",
            ToolId::EditScene => "edit_scene",
            ToolId::EditScript => "edit_script",
            ToolId::GenerateSprite => "generate_sprite",
            ToolId::GenerateAnimation => "generate_animation",
            ToolId::DeleteResource => "delete_resource",
        }
    }

    pub fn from_str(s: &str) -> Option<ToolId> {
        match s {
            "create_scene" => Some(ToolId::CreateScene),
            "edit_scene" => Some(ToolId::EditScene),
            "edit_script" => Some(ToolId::EditScript),
            "generate_sprite" => Some(ToolId::GenerateSprite),
            "generate_animation" => Some(ToolId::GenerateAnimation),
            "delete_resource" => Some(ToolId::DeleteResource),
            _ => None,
        }
    }

    /// Destructive operations require human approval before the owning
    /// sub-task may run.
    pub fn is_destructive(&self) -> bool {
        matches!(self, ToolId::DeleteResource)
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
