// crates/toolhub-gateway/src/backend_http.rs
// ============================================================================
// Module: HTTP Backend Registry
// Description: Backend registry over MCP streamable-HTTP tool servers.
// Purpose: Connect configured backends and proxy tool listing and invocation.
// Dependencies: toolhub-core, toolhub-config, reqwest, tokio, bytes
// ============================================================================

//! ## Overview
//! Each configured backend is an MCP server reachable over streamable HTTP.
//! Connecting performs the `initialize` handshake, captures the
//! `mcp-session-id` header, and sends `notifications/initialized`. Requests
//! accept either a JSON body or an SSE stream; while streaming, a
//! `notifications/progress` message restarts the call deadline when the
//! caller asked for it. Bodies are capped at [`MAX_BACKEND_RESPONSE_BYTES`].
//! A 404 on a request that carried a session id means the backend dropped the
//! session: the registry re-initializes once and retries. Handshakes are
//! serialized per backend, so concurrent requests that hit the same expired
//! session share one re-initialize.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio::time::timeout_at;
use toolhub_config::BackendConfig;
use toolhub_core::BackendError;
use toolhub_core::BackendRegistry;
use toolhub_core::CallOptions;
use toolhub_core::PartitionId;
use toolhub_core::RuntimeStatus;
use toolhub_core::ServerDescriptor;
use toolhub_core::ToolDescriptor;

use crate::jsonrpc::LATEST_PROTOCOL_VERSION;
use crate::session::SESSION_HEADER;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum backend response size in bytes.
pub const MAX_BACKEND_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Deadline for handshake and listing requests.
pub const CONTROL_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Maximum `tools/list` pages followed per listing.
const MAX_TOOL_PAGES: usize = 64;
/// Longest window a deadline schedules; larger windows saturate here.
const MAX_DEADLINE_WINDOW: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);
/// Client name announced during the handshake.
const CLIENT_NAME: &str = "toolhub-gateway";

// ============================================================================
// SECTION: Backend Spec
// ============================================================================

/// Static description of one HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpBackendSpec {
    /// Unique backend name.
    pub name: String,
    /// Endpoint URL.
    pub url: String,
    /// Optional description.
    pub description: Option<String>,
    /// Owning partition.
    pub partition: Option<PartitionId>,
    /// Operator disable flag.
    pub disabled: bool,
    /// Optional bearer token sent to the backend.
    pub bearer_token: Option<String>,
    /// Per-tool enable map.
    pub tool_permissions: BTreeMap<String, bool>,
}

impl HttpBackendSpec {
    /// Builds a spec from a config entry.
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            description: config.description.clone(),
            partition: config.partition.clone().map(PartitionId::new),
            disabled: config.disabled,
            bearer_token: config.bearer_token.clone(),
            tool_permissions: config.tool_permissions.clone(),
        }
    }

    /// Builds an enabled, unassigned spec for a URL.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            description: None,
            partition: None,
            disabled: false,
            bearer_token: None,
            tool_permissions: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Connection State
// ============================================================================

/// Mutable connection state of one backend.
struct ConnectionState {
    /// Current lifecycle status.
    status: RuntimeStatus,
    /// Backend-issued MCP session id.
    session_id: Option<String>,
}

/// One backend and its connection.
struct BackendConnection {
    /// Static backend description.
    spec: HttpBackendSpec,
    /// Connection state.
    state: RwLock<ConnectionState>,
    /// Next JSON-RPC request id.
    next_id: AtomicU64,
    /// Serializes handshakes so one expired session triggers one re-initialize.
    handshake_lock: Mutex<()>,
}

impl BackendConnection {
    /// Returns a fresh request id.
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Failure of one request attempt.
enum AttemptError {
    /// The backend no longer recognizes the session id that was sent.
    SessionExpired(String),
    /// Any other failure.
    Backend(BackendError),
}

impl From<BackendError> for AttemptError {
    fn from(error: BackendError) -> Self {
        Self::Backend(error)
    }
}

/// Call deadline that can be restarted on progress.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    /// Expiry instant.
    at: Instant,
    /// Window restored by [`Deadline::restart`].
    window: Duration,
}

impl Deadline {
    /// Starts a deadline `window` from now.
    fn after(window: Duration) -> Self {
        Self {
            at: expiry_from_now(window),
            window,
        }
    }

    /// Restarts the full window from now.
    fn restart(&mut self) {
        self.at = expiry_from_now(self.window);
    }

    /// Builds the error reported on expiry.
    fn expired(self) -> BackendError {
        BackendError::Timeout(self.window.as_millis())
    }
}

/// Returns the instant `window` from now, saturating far in the future.
fn expiry_from_now(window: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(window.min(MAX_DEADLINE_WINDOW))
        .unwrap_or_else(|| now.checked_add(Duration::from_secs(60 * 60 * 24)).unwrap_or(now))
}

/// JSON-RPC message received from a backend.
#[derive(Debug, Deserialize)]
struct BackendMessage {
    /// Response id; absent on notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Notification method.
    #[serde(default)]
    method: Option<String>,
    /// Success payload.
    #[serde(default)]
    result: Option<Value>,
    /// Error payload.
    #[serde(default)]
    error: Option<BackendErrorBody>,
}

/// JSON-RPC error body received from a backend.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    /// Error code.
    code: i64,
    /// Error message.
    message: String,
}

impl BackendMessage {
    /// Converts a response message into the call result.
    fn into_result(self) -> Result<Value, BackendError> {
        if let Some(error) = self.error {
            return Err(BackendError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Backend registry over MCP streamable-HTTP servers.
pub struct HttpBackendRegistry {
    /// Shared HTTP client.
    client: Client,
    /// Backends keyed by name.
    backends: BTreeMap<String, Arc<BackendConnection>>,
}

impl HttpBackendRegistry {
    /// Builds a registry; backends start `stopped` until connected.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] when the HTTP client cannot be built.
    pub fn new(specs: Vec<HttpBackendSpec>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        let backends = specs
            .into_iter()
            .map(|spec| {
                let connection = BackendConnection {
                    spec,
                    state: RwLock::new(ConnectionState {
                        status: RuntimeStatus::Stopped,
                        session_id: None,
                    }),
                    next_id: AtomicU64::new(1),
                    handshake_lock: Mutex::new(()),
                };
                (connection.spec.name.clone(), Arc::new(connection))
            })
            .collect();
        Ok(Self {
            client,
            backends,
        })
    }

    /// Builds a registry from configured backends.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(backends: &[BackendConfig]) -> Result<Self, BackendError> {
        Self::new(backends.iter().map(HttpBackendSpec::from_config).collect())
    }

    /// Connects every enabled backend; returns per-backend failures.
    ///
    /// Failed backends report `error` status; disabled backends stay `stopped`.
    pub async fn connect_all(&self) -> Vec<(String, BackendError)> {
        let mut failures = Vec::new();
        for connection in self.backends.values() {
            if connection.spec.disabled {
                continue;
            }
            if let Err(err) = self.initialize(connection).await {
                failures.push((connection.spec.name.clone(), err));
            }
        }
        failures
    }

    /// Runs the MCP handshake and records the resulting status.
    async fn initialize(&self, connection: &BackendConnection) -> Result<(), BackendError> {
        let _handshake = connection.handshake_lock.lock().await;
        {
            let mut state = connection.state.write().await;
            state.status = RuntimeStatus::Starting;
            state.session_id = None;
        }
        let outcome = self.handshake(connection).await;
        let mut state = connection.state.write().await;
        match outcome {
            Ok(session_id) => {
                state.status = RuntimeStatus::Running;
                state.session_id = session_id;
                Ok(())
            }
            Err(err) => {
                state.status = RuntimeStatus::Error;
                Err(err)
            }
        }
    }

    /// Replaces the expired session `stale` with a fresh one.
    ///
    /// Concurrent callers holding the same stale id share one handshake; the
    /// backend stays `running` while the new session is negotiated.
    async fn reinitialize(
        &self,
        connection: &BackendConnection,
        stale: &str,
    ) -> Result<(), BackendError> {
        let _handshake = connection.handshake_lock.lock().await;
        {
            let state = connection.state.read().await;
            if state.status == RuntimeStatus::Running && state.session_id.as_deref() != Some(stale) {
                return Ok(());
            }
        }
        let outcome = self.handshake(connection).await;
        let mut state = connection.state.write().await;
        match outcome {
            Ok(session_id) => {
                state.status = RuntimeStatus::Running;
                state.session_id = session_id;
                Ok(())
            }
            Err(err) => {
                state.status = RuntimeStatus::Error;
                state.session_id = None;
                Err(err)
            }
        }
    }

    /// Sends `initialize` then `notifications/initialized`.
    async fn handshake(&self, connection: &BackendConnection) -> Result<Option<String>, BackendError> {
        let params = json!({
            "protocolVersion": LATEST_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": CLIENT_NAME, "version": env!("CARGO_PKG_VERSION")}
        });
        let body = json!({
            "jsonrpc": "2.0",
            "id": connection.next_id(),
            "method": "initialize",
            "params": params
        });
        let deadline = Deadline::after(CONTROL_REQUEST_TIMEOUT);
        let response = self.post(connection, &body, None, deadline).await?;
        if !response.status().is_success() {
            return Err(BackendError::Transport(format!(
                "initialize returned http status {}",
                response.status().as_u16()
            )));
        }
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let options = CallOptions {
            timeout: CONTROL_REQUEST_TIMEOUT,
            reset_timeout_on_progress: false,
        };
        read_reply(response, &body["id"], options, deadline).await?;
        let notification = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let response = self.post(connection, &notification, session_id.as_deref(), deadline).await?;
        if !response.status().is_success() {
            return Err(BackendError::Transport(format!(
                "initialized notification returned http status {}",
                response.status().as_u16()
            )));
        }
        Ok(session_id)
    }

    /// Returns the connection for a running backend.
    async fn running(&self, server: &str) -> Result<&Arc<BackendConnection>, BackendError> {
        let connection =
            self.backends.get(server).ok_or_else(|| BackendError::NotConnected(server.to_string()))?;
        if connection.spec.disabled || connection.state.read().await.status != RuntimeStatus::Running {
            return Err(BackendError::NotConnected(server.to_string()));
        }
        Ok(connection)
    }

    /// Sends a request, re-initializing once when the session expired.
    async fn request(
        &self,
        connection: &BackendConnection,
        method: &str,
        params: Value,
        options: CallOptions,
    ) -> Result<Value, BackendError> {
        match self.attempt(connection, method, &params, options).await {
            Ok(value) => Ok(value),
            Err(AttemptError::Backend(err)) => Err(err),
            Err(AttemptError::SessionExpired(stale)) => {
                self.reinitialize(connection, &stale).await?;
                match self.attempt(connection, method, &params, options).await {
                    Ok(value) => Ok(value),
                    Err(AttemptError::Backend(err)) => Err(err),
                    Err(AttemptError::SessionExpired(_)) => {
                        Err(BackendError::Transport("backend session expired".to_string()))
                    }
                }
            }
        }
    }

    /// Sends one request attempt.
    async fn attempt(
        &self,
        connection: &BackendConnection,
        method: &str,
        params: &Value,
        options: CallOptions,
    ) -> Result<Value, AttemptError> {
        let session_id = connection.state.read().await.session_id.clone();
        let body = json!({
            "jsonrpc": "2.0",
            "id": connection.next_id(),
            "method": method,
            "params": params
        });
        let deadline = Deadline::after(options.timeout);
        let response = self.post(connection, &body, session_id.as_deref(), deadline).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND
            && let Some(stale) = session_id
        {
            return Err(AttemptError::SessionExpired(stale));
        }
        if !status.is_success() {
            let preview = read_body_with_limit(response, 512, deadline).await.unwrap_or_default();
            return Err(AttemptError::Backend(BackendError::Transport(format!(
                "http status {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&preview).trim()
            ))));
        }
        Ok(read_reply(response, &body["id"], options, deadline).await?)
    }

    /// Posts one JSON-RPC body.
    async fn post(
        &self,
        connection: &BackendConnection,
        body: &Value,
        session_id: Option<&str>,
        deadline: Deadline,
    ) -> Result<reqwest::Response, BackendError> {
        let headers = request_headers(&connection.spec, session_id)?;
        let send = self.client.post(&connection.spec.url).headers(headers).json(body).send();
        match timeout_at(deadline.at, send).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(BackendError::Transport(err.to_string())),
            Err(_) => Err(deadline.expired()),
        }
    }
}

#[async_trait]
impl BackendRegistry for HttpBackendRegistry {
    async fn servers(&self) -> Vec<ServerDescriptor> {
        let mut servers = Vec::with_capacity(self.backends.len());
        for connection in self.backends.values() {
            let spec = &connection.spec;
            let status = connection.state.read().await.status;
            servers.push(ServerDescriptor {
                name: spec.name.clone(),
                description: spec.description.clone(),
                runtime_status: status,
                disabled: spec.disabled,
                tool_permissions: spec.tool_permissions.clone(),
                partition: spec.partition.clone(),
            });
        }
        servers
    }

    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, BackendError> {
        let connection = self.running(server).await?;
        let options = CallOptions {
            timeout: CONTROL_REQUEST_TIMEOUT,
            reset_timeout_on_progress: false,
        };
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0 .. MAX_TOOL_PAGES {
            let params = cursor.as_ref().map_or_else(|| json!({}), |cursor| json!({"cursor": cursor}));
            let mut result = self.request(connection, "tools/list", params, options).await?;
            let page = result.get_mut("tools").map_or_else(|| json!([]), Value::take);
            let page: Vec<ToolDescriptor> = serde_json::from_value(page)
                .map_err(|err| BackendError::Protocol(format!("invalid tools/list result: {err}")))?;
            tools.extend(page);
            cursor = result.get("nextCursor").and_then(Value::as_str).map(str::to_string);
            if cursor.is_none() {
                return Ok(tools);
            }
        }
        Err(BackendError::Protocol("tools/list pagination did not terminate".to_string()))
    }

    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
        options: CallOptions,
    ) -> Result<Value, BackendError> {
        let connection = self.running(server).await?;
        let progress_token = format!("toolhub-{}", connection.next_id());
        let params = json!({
            "name": tool,
            "arguments": arguments,
            "_meta": {"progressToken": progress_token}
        });
        self.request(connection, "tools/call", params, options).await
    }
}

// ============================================================================
// SECTION: HTTP Helpers
// ============================================================================

/// Builds request headers for a backend.
fn request_headers(
    spec: &HttpBackendSpec,
    session_id: Option<&str>,
) -> Result<HeaderMap, BackendError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/event-stream"));
    if let Some(token) = &spec.bearer_token {
        let header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| BackendError::Transport("invalid bearer token header".to_string()))?;
        headers.insert(AUTHORIZATION, header);
    }
    if let Some(session_id) = session_id {
        let header = HeaderValue::from_str(session_id)
            .map_err(|_| BackendError::Protocol("invalid backend session id".to_string()))?;
        headers.insert(SESSION_HEADER, header);
    }
    Ok(headers)
}

/// Reads the reply matching `id` from a JSON or SSE response.
async fn read_reply(
    response: reqwest::Response,
    id: &Value,
    options: CallOptions,
    deadline: Deadline,
) -> Result<Value, BackendError> {
    let is_sse = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"));
    if is_sse {
        return read_sse_reply(response, id, options, deadline).await;
    }
    let body = read_body_with_limit(response, MAX_BACKEND_RESPONSE_BYTES, deadline).await?;
    let message: BackendMessage = serde_json::from_slice(&body)
        .map_err(|err| BackendError::Protocol(format!("invalid json-rpc response: {err}")))?;
    message.into_result()
}

/// Reads an SSE response until the reply for `id` arrives.
async fn read_sse_reply(
    mut response: reqwest::Response,
    id: &Value,
    options: CallOptions,
    mut deadline: Deadline,
) -> Result<Value, BackendError> {
    let mut decoder = SseDecoder::default();
    let mut total: usize = 0;
    loop {
        let chunk = match timeout_at(deadline.at, response.chunk()).await {
            Ok(Ok(Some(chunk))) => chunk,
            Ok(Ok(None)) => {
                return Err(BackendError::Protocol("stream ended without a response".to_string()));
            }
            Ok(Err(err)) => return Err(BackendError::Transport(err.to_string())),
            Err(_) => return Err(deadline.expired()),
        };
        total = total.saturating_add(chunk.len());
        if total > MAX_BACKEND_RESPONSE_BYTES {
            return Err(BackendError::Protocol(format!(
                "response exceeds {MAX_BACKEND_RESPONSE_BYTES} bytes"
            )));
        }
        for data in decoder.push(&chunk) {
            let Ok(message) = serde_json::from_str::<BackendMessage>(&data) else {
                continue;
            };
            if message.id.as_ref() == Some(id) && message.method.is_none() {
                return message.into_result();
            }
            if message.method.as_deref() == Some("notifications/progress")
                && options.reset_timeout_on_progress
            {
                deadline.restart();
            }
        }
    }
}

/// Reads a response body while enforcing a hard byte limit.
async fn read_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
    deadline: Deadline,
) -> Result<Vec<u8>, BackendError> {
    let mut body = Vec::new();
    loop {
        let chunk = match timeout_at(deadline.at, response.chunk()).await {
            Ok(Ok(Some(chunk))) => chunk,
            Ok(Ok(None)) => return Ok(body),
            Ok(Err(err)) => return Err(BackendError::Transport(err.to_string())),
            Err(_) => return Err(deadline.expired()),
        };
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(BackendError::Protocol(format!("response exceeds {limit} bytes")));
        }
        body.extend_from_slice(&chunk);
    }
}

// ============================================================================
// SECTION: SSE Decoding
// ============================================================================

/// Incremental decoder yielding the `data` payload of each complete event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes not yet terminated by a blank line.
    buffer: BytesMut,
}

impl SseDecoder {
    /// Feeds bytes and returns the data payloads of completed events.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().copied().filter(|byte| *byte != b'\r'));
        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|window| window == b"\n\n") {
            let raw = self.buffer.split_to(end + 2);
            let text = String::from_utf8_lossy(&raw);
            let data: Vec<&str> = text
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|value| value.strip_prefix(' ').unwrap_or(value))
                .collect();
            if !data.is_empty() {
                events.push(data.join("\n"));
            }
        }
        events
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
