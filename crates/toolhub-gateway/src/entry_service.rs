// crates/toolhub-gateway/src/entry_service.rs
// ============================================================================
// Module: Entry Facade Service
// Description: Enumerate-one-server and call-one-tool business logic.
// Purpose: Validate facade calls strictly before any backend invocation.
// Dependencies: toolhub-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The facade exposes two operations. Enumeration never fails: every miss is
//! reported as an empty listing with a message. Invocation validates in a
//! fixed order and stops at the first failure, each with its own error code:
//! server exists, server running, server enabled, tool present in the live
//! list, tool permitted. Only then is the registry call primitive used, and
//! any failure it reports becomes a `CALL_FAILED` result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use toolhub_core::BackendRegistry;
use toolhub_core::CallOptions;
use toolhub_core::ContentItem;
use toolhub_core::PartitionId;
use toolhub_core::RuntimeStatus;
use toolhub_core::ServerDescriptor;
use toolhub_core::ToolDescriptor;
use toolhub_core::normalize_tool_output;

use crate::jsonrpc::ToolCallResult;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Machine-readable facade error codes.
///
/// # Invariants
/// - Serialized labels are stable for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryErrorCode {
    /// No server with the requested name.
    ServerNotFound,
    /// Server exists but is not running.
    ServerNotRunning,
    /// Server is disabled by the operator.
    ServerDisabled,
    /// The live tool list could not be fetched.
    ToolsFetchFailed,
    /// The server does not advertise the tool.
    ToolNotFound,
    /// The tool is disabled in the permission map.
    ToolDisabled,
    /// The backend call failed or timed out.
    CallFailed,
    /// Required facade parameters are missing.
    InvalidParams,
    /// The facade operation name is unknown.
    UnknownOperation,
}

impl EntryErrorCode {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServerNotFound => "SERVER_NOT_FOUND",
            Self::ServerNotRunning => "SERVER_NOT_RUNNING",
            Self::ServerDisabled => "SERVER_DISABLED",
            Self::ToolsFetchFailed => "TOOLS_FETCH_FAILED",
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::ToolDisabled => "TOOL_DISABLED",
            Self::CallFailed => "CALL_FAILED",
            Self::InvalidParams => "INVALID_PARAMS",
            Self::UnknownOperation => "UNKNOWN_OPERATION",
        }
    }
}

/// One server entry in an enumeration result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerToolsEntry {
    /// Server name.
    pub name: String,
    /// Server description.
    pub description: Option<String>,
    /// Server runtime status.
    pub status: RuntimeStatus,
    /// Number of advertised tools.
    pub tool_count: usize,
    /// Advertised tools with their input schemas.
    pub tools: Vec<ToolDescriptor>,
}

/// Enumeration result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerToolsListing {
    /// Zero or one server entries.
    pub servers: Vec<ServerToolsEntry>,
    /// Explanation when no server is listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerToolsListing {
    /// Builds an empty listing with a message.
    fn empty(message: String) -> Self {
        Self {
            servers: Vec::new(),
            message: Some(message),
        }
    }
}

/// Validated call-one-tool request.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    /// Target server name.
    pub server_name: String,
    /// Target tool name.
    pub tool_name: String,
    /// Tool arguments.
    pub arguments: Value,
    /// Per-call timeout override.
    pub timeout: Option<Duration>,
}

/// Call-one-tool outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallOutcome {
    /// Result content.
    pub content: Vec<ContentItem>,
    /// Error flag.
    pub is_error: bool,
    /// Gateway-side error code when the call was rejected or failed.
    pub error_code: Option<EntryErrorCode>,
}

impl ToolCallOutcome {
    /// Builds a rejected outcome with a text message.
    #[must_use]
    pub fn rejected(code: EntryErrorCode, message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(message)],
            is_error: true,
            error_code: Some(code),
        }
    }

    /// Returns the first text item, used as the error message.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentItem::as_text)
    }

    /// Converts the outcome into a `tools/call` result payload.
    #[must_use]
    pub fn into_result(self) -> ToolCallResult {
        ToolCallResult {
            content: self.content,
            is_error: self.is_error,
            error_code: self.error_code.map(|code| code.as_str().to_string()),
            structured_content: None,
        }
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Facade business logic over an injected backend registry.
#[derive(Clone)]
pub struct EntryService {
    /// Backend registry.
    registry: Arc<dyn BackendRegistry>,
    /// Default call timeout.
    call_timeout: Duration,
}

impl EntryService {
    /// Creates a service with the default call timeout.
    #[must_use]
    pub fn new(registry: Arc<dyn BackendRegistry>, call_timeout: Duration) -> Self {
        Self {
            registry,
            call_timeout,
        }
    }

    /// Lists the tools of one server visible in the partition scope.
    pub async fn list_server_tools(
        &self,
        server_name: Option<&str>,
        partition: Option<&PartitionId>,
    ) -> ServerToolsListing {
        let Some(name) = server_name.map(str::trim).filter(|name| !name.is_empty()) else {
            return ServerToolsListing::empty(
                "No mcpName provided. Consult the available server summary and call \
                 list_mcp_tools with the mcpName of the server you want to inspect."
                    .to_string(),
            );
        };
        let servers = self.registry.servers().await;
        let Some(server) = servers
            .into_iter()
            .find(|server| server.name == name && server.is_callable() && server.visible_in(partition))
        else {
            return ServerToolsListing::empty(format!(
                "Server \"{name}\" was not found among running servers in {}.",
                scope_label(partition)
            ));
        };
        match self.registry.list_tools(&server.name).await {
            Ok(tools) => ServerToolsListing {
                servers: vec![ServerToolsEntry {
                    name: server.name,
                    description: server.description,
                    status: server.runtime_status,
                    tool_count: tools.len(),
                    tools,
                }],
                message: None,
            },
            Err(err) => ServerToolsListing::empty(format!(
                "Failed to fetch tools for server \"{name}\": {err}"
            )),
        }
    }

    /// Validates and invokes one tool.
    pub async fn call_tool(&self, request: ToolCallRequest) -> ToolCallOutcome {
        let server = match self.check_server(&request.server_name).await {
            Ok(server) => server,
            Err(outcome) => return outcome,
        };
        match self.registry.list_tools(&server.name).await {
            Ok(tools) => {
                if !tools.iter().any(|tool| tool.name == request.tool_name) {
                    return ToolCallOutcome::rejected(
                        EntryErrorCode::ToolNotFound,
                        format!(
                            "Tool \"{}\" not found on server \"{}\"",
                            request.tool_name, server.name
                        ),
                    );
                }
            }
            Err(err) => {
                return ToolCallOutcome::rejected(
                    EntryErrorCode::ToolsFetchFailed,
                    format!("Failed to fetch tools for server \"{}\": {err}", server.name),
                );
            }
        }
        self.invoke(&server, request).await
    }

    /// Checks the permission map, then invokes a tool known to exist on `server`.
    pub(crate) async fn invoke(
        &self,
        server: &ServerDescriptor,
        request: ToolCallRequest,
    ) -> ToolCallOutcome {
        if !server.tool_allowed(&request.tool_name) {
            return ToolCallOutcome::rejected(
                EntryErrorCode::ToolDisabled,
                format!("Tool \"{}\" is disabled on server \"{}\"", request.tool_name, server.name),
            );
        }
        let arguments = match request.arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let options = CallOptions::with_timeout(request.timeout.unwrap_or(self.call_timeout));
        match self.registry.call_tool(&server.name, &request.tool_name, arguments, options).await {
            Ok(payload) => {
                let output = normalize_tool_output(payload);
                ToolCallOutcome {
                    content: output.content,
                    is_error: output.is_error,
                    error_code: None,
                }
            }
            Err(err) => ToolCallOutcome::rejected(EntryErrorCode::CallFailed, err.to_string()),
        }
    }

    /// Checks existence, running status, and the disable flag in that order.
    async fn check_server(&self, name: &str) -> Result<ServerDescriptor, ToolCallOutcome> {
        let servers = self.registry.servers().await;
        let Some(server) = servers.into_iter().find(|server| server.name == name) else {
            return Err(ToolCallOutcome::rejected(
                EntryErrorCode::ServerNotFound,
                format!("Server \"{name}\" not found"),
            ));
        };
        if server.runtime_status != RuntimeStatus::Running {
            return Err(ToolCallOutcome::rejected(
                EntryErrorCode::ServerNotRunning,
                format!(
                    "Server \"{name}\" is not running (status: {})",
                    server.runtime_status.as_str()
                ),
            ));
        }
        if server.disabled {
            return Err(ToolCallOutcome::rejected(
                EntryErrorCode::ServerDisabled,
                format!("Server \"{name}\" is disabled"),
            ));
        }
        Ok(server)
    }
}

/// Renders a partition scope for messages.
fn scope_label(partition: Option<&PartitionId>) -> String {
    match partition {
        None => "any project".to_string(),
        Some(partition) if partition.is_unassigned() => "unassigned servers".to_string(),
        Some(partition) => format!("project \"{partition}\""),
    }
}
