// crates/toolhub-gateway/src/jsonrpc.rs
// ============================================================================
// Module: JSON-RPC Envelopes
// Description: JSON-RPC 2.0 request/response types and MCP lifecycle helpers.
// Purpose: Share one envelope vocabulary across the facade and the aggregator.
// Dependencies: toolhub-core, axum, serde, serde_json
// ============================================================================

//! ## Overview
//! Both gateway endpoints speak JSON-RPC 2.0. This module owns the envelope
//! types, the stable error codes, request parsing with a body-size limit, and
//! the lifecycle methods (`initialize`, `ping`, notifications) every MCP
//! endpoint must answer identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use toolhub_core::ContentItem;
use toolhub_core::PartitionId;

use crate::telemetry::RouteKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";
/// Malformed JSON or envelope.
pub const INVALID_REQUEST: i64 = -32600;
/// Unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Malformed method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Unexpected gateway fault.
pub const INTERNAL_ERROR: i64 = -32603;
/// Missing or rejected credentials.
pub const UNAUTHENTICATED: i64 = -32001;
/// Unresolvable partition header.
pub const PARTITION_REJECTED: i64 = -32002;
/// Unknown streaming session.
pub const SESSION_NOT_FOUND: i64 = -32004;
/// Request body over the configured limit.
pub const BODY_TOO_LARGE: i64 = -32070;

/// MCP protocol versions this gateway can speak, oldest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];
/// Protocol version offered when the client asks for an unknown one.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// Incoming JSON-RPC request payload.
///
/// A missing `id` marks a notification, which never receives a response. An
/// explicit `"id": null` is kept as `Some(Value::Null)` and is answered.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier; `None` only when the member is absent.
    #[serde(default, deserialize_with = "present_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Returns true when the request is a notification.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the id to echo, `null` for notifications.
    #[must_use]
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// Keeps a present `id` member, including `null`, as `Some`.
fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success envelope.
    #[must_use]
    pub const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error envelope.
    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Serializes the envelope, falling back to a fixed internal error.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            "{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32603,\"message\":\
             \"serialization failed\"}}"
                .to_string()
        })
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// SECTION: Tool Payloads
// ============================================================================

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Tool name.
    pub name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// `tools/call` result payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Tool output content.
    pub content: Vec<ContentItem>,
    /// Error flag.
    pub is_error: bool,
    /// Machine-readable error code for gateway-side failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Structured payload mirroring the text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolCallResult {
    /// Builds an error result with a single text item.
    #[must_use]
    pub fn error_text(message: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            content: vec![ContentItem::text(message)],
            is_error: true,
            error_code: code.map(str::to_string),
            structured_content: None,
        }
    }
}

// ============================================================================
// SECTION: Call Metadata
// ============================================================================

/// Per-request metadata handed to an endpoint.
///
/// # Invariants
/// - Built fresh for every request and never shared across calls.
#[derive(Clone)]
pub struct CallMetadata {
    /// Caller bearer token.
    pub token: String,
    /// Effective partition scope.
    pub partition: Option<PartitionId>,
    /// Route the request arrived on.
    pub route: RouteKind,
}

impl fmt::Debug for CallMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallMetadata")
            .field("token", &"<redacted>")
            .field("partition", &self.partition)
            .field("route", &self.route)
            .finish()
    }
}

/// An MCP endpoint reachable through the gateway.
#[async_trait]
pub trait McpEndpoint: Send + Sync {
    /// Handles one request; returns `None` for notifications.
    async fn handle(&self, request: JsonRpcRequest, meta: &CallMetadata)
    -> Option<JsonRpcResponse>;
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses and validates a JSON-RPC request body.
///
/// # Errors
///
/// Returns the HTTP status and error envelope for oversize, malformed, or
/// wrong-version requests.
pub fn parse_request(
    bytes: &[u8],
    max_body_bytes: usize,
) -> Result<JsonRpcRequest, (StatusCode, JsonRpcResponse)> {
    if bytes.len() > max_body_bytes {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            JsonRpcResponse::failure(Value::Null, BODY_TOO_LARGE, "request body too large"),
        ));
    }
    let request: JsonRpcRequest = serde_json::from_slice(bytes).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(Value::Null, INVALID_REQUEST, "invalid json-rpc request"),
        )
    })?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err((
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(
                request.response_id(),
                INVALID_REQUEST,
                "unsupported json-rpc version",
            ),
        ));
    }
    Ok(request)
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Outcome of lifecycle handling.
#[derive(Debug)]
pub enum Lifecycle {
    /// Lifecycle method handled; respond with the payload (or nothing).
    Handled(Option<JsonRpcResponse>),
    /// Not a lifecycle method; the endpoint must handle it.
    Pass(JsonRpcRequest),
}

/// Answers `initialize`, `ping`, and `notifications/*` uniformly.
#[must_use]
pub fn handle_lifecycle(request: JsonRpcRequest, server_name: &str) -> Lifecycle {
    if request.method.starts_with("notifications/") || request.is_notification() {
        return Lifecycle::Handled(None);
    }
    match request.method.as_str() {
        "initialize" => {
            let requested = request
                .params
                .as_ref()
                .and_then(|params| params.get("protocolVersion"))
                .and_then(Value::as_str);
            let version = negotiate_protocol_version(requested);
            let result = json!({
                "protocolVersion": version,
                "capabilities": {
                    "tools": {"listChanged": false},
                    "resources": {},
                    "prompts": {}
                },
                "serverInfo": {
                    "name": server_name,
                    "version": env!("CARGO_PKG_VERSION")
                }
            });
            Lifecycle::Handled(Some(JsonRpcResponse::success(request.response_id(), result)))
        }
        "ping" => Lifecycle::Handled(Some(JsonRpcResponse::success(request.response_id(), json!({})))),
        _ => Lifecycle::Pass(request),
    }
}

/// Echoes a supported protocol version, else offers the latest.
#[must_use]
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|requested| {
            SUPPORTED_PROTOCOL_VERSIONS.iter().copied().find(|version| *version == requested)
        })
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// Builds a success envelope carrying a serialized tool result.
#[must_use]
pub fn tool_result_response(id: Value, result: &ToolCallResult) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(_) => JsonRpcResponse::failure(id, INTERNAL_ERROR, "serialization failed"),
    }
}
