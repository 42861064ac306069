// crates/toolhub-gateway/src/entry_server.rs
// ============================================================================
// Module: Entry Facade Server
// Description: JSON-RPC adaptation of the entry facade service.
// Purpose: Publish exactly two fixed tools and dispatch calls to the service.
// Dependencies: toolhub-core, async-trait, serde_json
// ============================================================================

//! ## Overview
//! `tools/list` always answers with the two facade descriptors, never with
//! backend tools. `tools/call` dispatches `list_mcp_tools` and
//! `call_mcp_tool`; unknown names produce an error result, not a protocol
//! fault. Every handled call is mirrored to the audit sink as a request-log
//! entry after the result is computed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use toolhub_core::ContentItem;

use crate::audit::AuditSink;
use crate::audit::CallOutcome;
use crate::audit::RequestLogEntry;
use crate::entry_service::EntryErrorCode;
use crate::entry_service::EntryService;
use crate::entry_service::ServerToolsListing;
use crate::entry_service::ToolCallOutcome;
use crate::entry_service::ToolCallRequest;
use crate::jsonrpc::CallMetadata;
use crate::jsonrpc::INVALID_PARAMS;
use crate::jsonrpc::JsonRpcRequest;
use crate::jsonrpc::JsonRpcResponse;
use crate::jsonrpc::Lifecycle;
use crate::jsonrpc::McpEndpoint;
use crate::jsonrpc::METHOD_NOT_FOUND;
use crate::jsonrpc::ToolCallParams;
use crate::jsonrpc::ToolCallResult;
use crate::jsonrpc::handle_lifecycle;
use crate::jsonrpc::tool_result_response;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Enumerate-one-server operation name.
pub const LIST_TOOLS_OPERATION: &str = "list_mcp_tools";
/// Call-one-tool operation name.
pub const CALL_TOOL_OPERATION: &str = "call_mcp_tool";
/// Server name reported by `initialize`.
pub const ENTRY_SERVER_NAME: &str = "toolhub-entry";

/// Returns the two fixed facade tool descriptors.
#[must_use]
pub fn facade_tools() -> Value {
    json!([
        {
            "name": LIST_TOOLS_OPERATION,
            "description": "List the tools of one MCP server, including each tool's input schema.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "mcpName": {
                        "type": "string",
                        "description": "Name of the MCP server to inspect."
                    }
                },
                "required": ["mcpName"]
            }
        },
        {
            "name": CALL_TOOL_OPERATION,
            "description": "Call one tool on one MCP server.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "mcpName": {
                        "type": "string",
                        "description": "Name of the MCP server that owns the tool."
                    },
                    "toolName": {
                        "type": "string",
                        "description": "Name of the tool to call."
                    },
                    "arguments": {
                        "type": "object",
                        "description": "Arguments matching the tool's input schema."
                    },
                    "timeoutSec": {
                        "type": "number",
                        "description": "Optional call timeout in seconds."
                    }
                },
                "required": ["mcpName", "toolName"]
            }
        }
    ])
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// JSON-RPC facade endpoint.
pub struct EntryServer {
    /// Facade business logic.
    service: EntryService,
    /// Request-log sink.
    audit: Arc<dyn AuditSink>,
}

impl EntryServer {
    /// Creates a facade endpoint.
    #[must_use]
    pub fn new(service: EntryService, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            service,
            audit,
        }
    }

    /// Handles a facade `tools/call` and mirrors it to the request log.
    async fn call(&self, params: ToolCallParams, meta: &CallMetadata) -> ToolCallResult {
        let started = Instant::now();
        let logged_params = json!({"name": &params.name, "arguments": &params.arguments});
        let (operation, result) = self.dispatch(&params.name, &params.arguments, meta).await;
        let elapsed_ms = started.elapsed().as_millis();
        let outcome = if result.is_error { CallOutcome::Error } else { CallOutcome::Success };
        let mut entry = RequestLogEntry::new(operation, logged_params, outcome, elapsed_ms);
        if result.is_error {
            entry.error_message =
                result.content.iter().find_map(ContentItem::as_text).map(str::to_string);
            entry.error_code =
                Some(result.error_code.clone().unwrap_or_else(|| "TOOL_ERROR".to_string()));
        }
        entry.partition = meta.partition.as_ref().map(|partition| partition.as_str().to_string());
        self.audit.record_request(&entry);
        result
    }

    /// Routes one facade operation; returns the qualified name and result.
    async fn dispatch(
        &self,
        name: &str,
        arguments: &Value,
        meta: &CallMetadata,
    ) -> (String, ToolCallResult) {
        match name {
            LIST_TOOLS_OPERATION => {
                let mcp_name = string_arg(arguments, "mcpName");
                let listing =
                    self.service.list_server_tools(mcp_name, meta.partition.as_ref()).await;
                let operation = mcp_name.map_or_else(
                    || LIST_TOOLS_OPERATION.to_string(),
                    |server| format!("{LIST_TOOLS_OPERATION}:{server}"),
                );
                (operation, listing_result(&listing))
            }
            CALL_TOOL_OPERATION => {
                let (Some(server_name), Some(tool_name)) =
                    (string_arg(arguments, "mcpName"), string_arg(arguments, "toolName"))
                else {
                    let outcome = ToolCallOutcome::rejected(
                        EntryErrorCode::InvalidParams,
                        "mcpName and toolName are required",
                    );
                    return (CALL_TOOL_OPERATION.to_string(), outcome.into_result());
                };
                let operation = format!("{CALL_TOOL_OPERATION}:{server_name}/{tool_name}");
                let request = ToolCallRequest {
                    server_name: server_name.to_string(),
                    tool_name: tool_name.to_string(),
                    arguments: arguments.get("arguments").cloned().unwrap_or(Value::Null),
                    timeout: timeout_arg(arguments),
                };
                (operation, self.service.call_tool(request).await.into_result())
            }
            other => {
                let outcome = ToolCallOutcome::rejected(
                    EntryErrorCode::UnknownOperation,
                    format!("Unknown tool: {other}"),
                );
                (other.to_string(), outcome.into_result())
            }
        }
    }
}

#[async_trait]
impl McpEndpoint for EntryServer {
    async fn handle(
        &self,
        request: JsonRpcRequest,
        meta: &CallMetadata,
    ) -> Option<JsonRpcResponse> {
        let request = match handle_lifecycle(request, ENTRY_SERVER_NAME) {
            Lifecycle::Handled(response) => return response,
            Lifecycle::Pass(request) => request,
        };
        let id = request.response_id();
        let response = match request.method.as_str() {
            "tools/list" => JsonRpcResponse::success(id, json!({"tools": facade_tools()})),
            "tools/call" => {
                let params = request.params.map(serde_json::from_value::<ToolCallParams>);
                match params {
                    Some(Ok(params)) => tool_result_response(id, &self.call(params, meta).await),
                    _ => JsonRpcResponse::failure(id, INVALID_PARAMS, "invalid tools/call params"),
                }
            }
            "resources/list" => JsonRpcResponse::success(id, json!({"resources": []})),
            "prompts/list" => JsonRpcResponse::success(id, json!({"prompts": []})),
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("unknown method: {other}")),
        };
        Some(response)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns a non-empty string argument.
fn string_arg<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
}

/// Parses the optional positive `timeoutSec` argument.
fn timeout_arg(arguments: &Value) -> Option<Duration> {
    arguments
        .get("timeoutSec")
        .and_then(Value::as_f64)
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
}

/// Renders an enumeration as a text summary plus structured content.
fn listing_result(listing: &ServerToolsListing) -> ToolCallResult {
    let mut text = String::new();
    if let Some(message) = &listing.message {
        text.push_str(message);
    }
    for server in &listing.servers {
        let _ = writeln!(text, "Server: {} ({})", server.name, server.status.as_str());
        if let Some(description) = &server.description {
            let _ = writeln!(text, "Description: {description}");
        }
        let _ = writeln!(text, "Tools ({}):", server.tool_count);
        for tool in &server.tools {
            let description = tool.description.as_deref().unwrap_or("(no description)");
            let _ = writeln!(text, "- {}: {description}", tool.name);
            if let Some(schema) = &tool.input_schema {
                let _ = writeln!(text, "  inputSchema: {schema}");
            }
        }
    }
    ToolCallResult {
        content: vec![ContentItem::text(text.trim_end())],
        is_error: false,
        error_code: None,
        structured_content: serde_json::to_value(listing).ok(),
    }
}
