// crates/toolhub-gateway/tests/common/mod.rs
// ============================================================================
// Module: Gateway Test Harness
// Description: Shared fakes and request helpers for gateway integration tests.
// Purpose: Drive the router in memory against a recording backend registry.
// Dependencies: toolhub-gateway, toolhub-core, tower
// ============================================================================

//! ## Overview
//! Provides a scripted [`FakeRegistry`] that records every call, a capturing
//! audit sink, and helpers that send requests through the router with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::missing_panics_doc, reason = "Test helpers panic on fixture errors.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::body::to_bytes;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use serde_json::Value;
use serde_json::json;
use toolhub_core::BackendError;
use toolhub_core::BackendRegistry;
use toolhub_core::CallOptions;
use toolhub_core::PartitionId;
use toolhub_core::ServerDescriptor;
use toolhub_core::ToolDescriptor;
use toolhub_gateway::AuditSink;
use toolhub_gateway::AuthAuditEvent;
use toolhub_gateway::Gateway;
use toolhub_gateway::GatewayDeps;
use toolhub_gateway::GatewaySettings;
use toolhub_gateway::NoopMetrics;
use toolhub_gateway::RequestLogEntry;
use toolhub_gateway::RouteAuditEvent;
use toolhub_gateway::StaticPartitionResolver;
use toolhub_gateway::StaticTokenValidator;
use toolhub_gateway::StaticWorkspace;
use tower::ServiceExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Token accepted by the test validator.
pub const TOKEN: &str = "secret-token";
/// Partition name known to the test resolver.
pub const PARTITION_NAME: &str = "alpha";
/// Partition id the test resolver maps [`PARTITION_NAME`] to.
pub const PARTITION_ID: &str = "p-alpha";

// ============================================================================
// SECTION: Fake Registry
// ============================================================================

/// One recorded registry call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Target server.
    pub server: String,
    /// Target tool.
    pub tool: String,
    /// Arguments as forwarded.
    pub arguments: Value,
    /// Call options as forwarded.
    pub options: CallOptions,
}

/// Scripted registry state.
#[derive(Default)]
struct FakeState {
    /// Advertised servers.
    servers: Vec<ServerDescriptor>,
    /// Tool list results keyed by server.
    tools: HashMap<String, Result<Vec<ToolDescriptor>, BackendError>>,
    /// Call results keyed by server and tool.
    results: HashMap<(String, String), Result<Value, BackendError>>,
    /// Recorded call primitive invocations.
    calls: Vec<RecordedCall>,
    /// Servers whose tools were listed, in order.
    list_calls: Vec<String>,
    /// Artificial latency keyed by tool name.
    delays: HashMap<String, Duration>,
}

/// Scripted backend registry that records every interaction.
#[derive(Default)]
pub struct FakeRegistry {
    /// Scripted state.
    state: Mutex<FakeState>,
}

impl FakeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a server advertising schema-bearing tools with the given names.
    #[must_use]
    pub fn with_server(self, server: ServerDescriptor, tools: &[&str]) -> Self {
        let tools = tools.iter().map(|name| tool_with_schema(name)).collect();
        {
            let mut state = self.state.lock().unwrap();
            state.tools.insert(server.name.clone(), Ok(tools));
            state.servers.push(server);
        }
        self
    }

    /// Makes `list_tools` fail for a server.
    #[must_use]
    pub fn failing_list(self, server: &str, error: BackendError) -> Self {
        self.state.lock().unwrap().tools.insert(server.to_string(), Err(error));
        self
    }

    /// Scripts the result of one tool call.
    #[must_use]
    pub fn responding(self, server: &str, tool: &str, result: Result<Value, BackendError>) -> Self {
        self.state.lock().unwrap().results.insert((server.to_string(), tool.to_string()), result);
        self
    }

    /// Delays every call to `tool` by `delay` before it answers.
    #[must_use]
    pub fn delaying(self, tool: &str, delay: Duration) -> Self {
        self.state.lock().unwrap().delays.insert(tool.to_string(), delay);
        self
    }

    /// Returns recorded call primitive invocations.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Returns servers whose tools were listed.
    pub fn list_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().list_calls.clone()
    }
}

#[async_trait]
impl BackendRegistry for FakeRegistry {
    async fn servers(&self) -> Vec<ServerDescriptor> {
        self.state.lock().unwrap().servers.clone()
    }

    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls.push(server.to_string());
        state.tools.get(server).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
        options: CallOptions,
    ) -> Result<Value, BackendError> {
        let (result, delay) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(RecordedCall {
                server: server.to_string(),
                tool: tool.to_string(),
                arguments,
                options,
            });
            let result = state
                .results
                .get(&(server.to_string(), tool.to_string()))
                .cloned()
                .unwrap_or_else(|| Ok(json!({"content": [{"type": "text", "text": "ok"}]})));
            (result, state.delays.get(tool).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

/// Registry whose every method panics.
pub struct PanickingRegistry;

#[async_trait]
impl BackendRegistry for PanickingRegistry {
    async fn servers(&self) -> Vec<ServerDescriptor> {
        panic!("registry exploded");
    }

    async fn list_tools(&self, _server: &str) -> Result<Vec<ToolDescriptor>, BackendError> {
        panic!("registry exploded");
    }

    async fn call_tool(
        &self,
        _server: &str,
        _tool: &str,
        _arguments: Value,
        _options: CallOptions,
    ) -> Result<Value, BackendError> {
        panic!("registry exploded");
    }
}

/// Builds a tool descriptor with a small object schema.
pub fn tool_with_schema(name: &str) -> ToolDescriptor {
    let mut tool = ToolDescriptor::named(name);
    tool.description = Some(format!("{name} tool"));
    tool.input_schema = Some(json!({
        "type": "object",
        "properties": {"path": {"type": "string"}}
    }));
    tool
}

/// Running server owned by a partition.
pub fn server_in(name: &str, partition: &str) -> ServerDescriptor {
    let mut server = ServerDescriptor::running(name);
    server.partition = Some(PartitionId::new(partition));
    server
}

// ============================================================================
// SECTION: Recording Audit Sink
// ============================================================================

/// Audit sink capturing events as JSON values.
#[derive(Default)]
pub struct RecordingAudit {
    /// Request-log entries.
    pub requests: Mutex<Vec<Value>>,
    /// Route audit events.
    pub routes: Mutex<Vec<Value>>,
    /// Auth audit events.
    pub auth: Mutex<Vec<Value>>,
}

impl RecordingAudit {
    /// Returns captured request-log entries.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Returns captured route events.
    pub fn routes(&self) -> Vec<Value> {
        self.routes.lock().unwrap().clone()
    }

    /// Returns captured auth events.
    pub fn auth(&self) -> Vec<Value> {
        self.auth.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record_request(&self, entry: &RequestLogEntry) {
        self.requests.lock().unwrap().push(serde_json::to_value(entry).unwrap());
    }

    fn record_route(&self, event: &RouteAuditEvent) {
        self.routes.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.auth.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

// ============================================================================
// SECTION: Gateway Builders
// ============================================================================

/// Builds collaborators over a registry with the standard token and partition.
pub fn deps(
    registry: Arc<dyn BackendRegistry>,
    audit: Arc<RecordingAudit>,
    remote: bool,
) -> GatewayDeps {
    let mut partitions = BTreeMap::new();
    partitions.insert(PARTITION_NAME.to_string(), PartitionId::new(PARTITION_ID));
    GatewayDeps {
        registry,
        validator: Arc::new(StaticTokenValidator::new([TOKEN])),
        resolver: Arc::new(StaticPartitionResolver::new(partitions)),
        workspace: Arc::new(StaticWorkspace::new(remote)),
        audit,
        metrics: Arc::new(NoopMetrics),
    }
}

/// Builds a gateway over a registry in a local workspace.
pub fn gateway(registry: Arc<dyn BackendRegistry>, audit: Arc<RecordingAudit>) -> Gateway {
    Gateway::new(deps(registry, audit, false), GatewaySettings::default())
}

// ============================================================================
// SECTION: Request Helpers
// ============================================================================

/// Builds a JSON-RPC `tools/call` body.
pub fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

/// Builds a JSON-RPC request body without params.
pub fn rpc(id: u64, method: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method})
}

/// Builds an authorized POST request, optionally scoped to a partition.
pub fn post(path: &str, body: &Value, partition: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(path)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {TOKEN}"));
    if let Some(partition) = partition {
        builder = builder.header(toolhub_gateway::PARTITION_HEADER, partition);
    }
    builder.body(Body::from(serde_json::to_vec(body).unwrap())).unwrap()
}

/// Sends a request and decodes the JSON body (or `Null` when empty).
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Returns the first text content item of a `tools/call` result.
pub fn result_text(body: &Value) -> String {
    body["result"]["content"][0]["text"].as_str().unwrap_or_default().to_string()
}
