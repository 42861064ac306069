// crates/toolhub-core/src/core/descriptors.rs
// ============================================================================
// Module: Toolhub Descriptors
// Description: Backend server and tool descriptors as seen by the gateway.
// Purpose: Carry runtime-discovered server state without typing tool schemas.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Descriptors are plain records. Tool descriptors are owned by the backend
//! that advertises them and are relayed verbatim; `input_schema` is an opaque
//! JSON value that is never inspected or rewritten.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::PartitionId;

// ============================================================================
// SECTION: Runtime Status
// ============================================================================

/// Lifecycle state of a backend server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStatus {
    /// Server is connected and serving requests.
    Running,
    /// Server is being started.
    Starting,
    /// Server is being stopped.
    Stopping,
    /// Server is not running.
    Stopped,
    /// Server failed to start or lost its connection.
    Error,
}

impl RuntimeStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Starting => "starting",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

// ============================================================================
// SECTION: Tool Descriptor
// ============================================================================

/// Tool advertised by a backend server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within its server.
    pub name: String,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque JSON schema for the tool arguments.
    #[serde(rename = "inputSchema", default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// Remaining descriptor fields (`title`, `outputSchema`, `annotations`,
    /// `_meta`, ...) relayed untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolDescriptor {
    /// Creates a descriptor with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
            extra: Map::new(),
        }
    }
}

// ============================================================================
// SECTION: Server Descriptor
// ============================================================================

/// Backend server snapshot exposed by the registry.
///
/// # Invariants
/// - A server is callable only when `runtime_status` is [`RuntimeStatus::Running`] and `disabled`
///   is false.
/// - A tool is callable unless `tool_permissions` maps it to `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDescriptor {
    /// Unique server name.
    pub name: String,
    /// Optional server description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current lifecycle state.
    pub runtime_status: RuntimeStatus,
    /// Operator-controlled disable flag.
    #[serde(default)]
    pub disabled: bool,
    /// Per-tool enable map; absent entries are allowed.
    #[serde(default)]
    pub tool_permissions: BTreeMap<String, bool>,
    /// Owning partition; `None` means unassigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionId>,
}

impl ServerDescriptor {
    /// Creates a running, enabled, unassigned server descriptor.
    #[must_use]
    pub fn running(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            runtime_status: RuntimeStatus::Running,
            disabled: false,
            tool_permissions: BTreeMap::new(),
            partition: None,
        }
    }

    /// Returns true when the server accepts tool calls.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        self.runtime_status == RuntimeStatus::Running && !self.disabled
    }

    /// Returns true unless the tool is explicitly disabled.
    #[must_use]
    pub fn tool_allowed(&self, tool_name: &str) -> bool {
        self.tool_permissions.get(tool_name).copied().unwrap_or(true)
    }

    /// Returns true when the server is visible under the partition scope.
    ///
    /// `None` applies no filter; the unassigned sentinel selects servers
    /// without a partition; any other id selects servers owned by it.
    #[must_use]
    pub fn visible_in(&self, scope: Option<&PartitionId>) -> bool {
        match scope {
            None => true,
            Some(scope) if scope.is_unassigned() => self.partition.is_none(),
            Some(scope) => self.partition.as_ref() == Some(scope),
        }
    }
}
