// crates/toolhub-gateway/src/server.rs
// ============================================================================
// Module: Gateway Server
// Description: HTTP router and server wiring for the gateway routes.
// Purpose: Gate, scope, and dispatch requests to the facade and aggregator.
// Dependencies: toolhub-core, toolhub-config, axum, tokio
// ============================================================================

//! ## Overview
//! The router exposes five routes:
//! - `POST /entry/mcp`: auth gate, lenient partition resolution, entry facade.
//! - `POST /mcp`: auth gate, strict partition gate, aggregator.
//! - `GET /sse`: auth gate, strict partition gate, session registration.
//! - `POST /messages`: auth gate, session lookup, aggregator dispatch whose
//!   reply travels over the session stream.
//! - `GET /health`: unauthenticated liveness probe.
//!
//! Each stream session has one worker that dispatches its posted messages in
//! arrival order. Dispatch runs on a spawned task so a panicking endpoint becomes a single
//! `-32603` envelope. Every routed request emits one route audit event and
//! one metrics observation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::future::Future;
use std::io::Write as _;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::body::to_bytes;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::Sse;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::StreamExt;
use toolhub_config::AuditSinkKind;
use toolhub_config::ConfigError;
use toolhub_config::ToolhubConfig;
use toolhub_core::ActiveWorkspace;
use toolhub_core::BackendRegistry;
use toolhub_core::CredentialValidator;
use toolhub_core::DEFAULT_CALL_TIMEOUT;
use toolhub_core::PartitionId;
use toolhub_core::PartitionResolver;

use crate::aggregator::Aggregator;
use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::RouteAuditEvent;
use crate::audit::StderrAuditSink;
use crate::auth::AuthAuditEvent;
use crate::auth::AuthContext;
use crate::auth::AuthError;
use crate::auth::StaticTokenValidator;
use crate::auth::authenticate;
use crate::backend_http::HttpBackendRegistry;
use crate::entry_server::EntryServer;
use crate::entry_service::EntryService;
use crate::jsonrpc::BODY_TOO_LARGE;
use crate::jsonrpc::CallMetadata;
use crate::jsonrpc::INTERNAL_ERROR;
use crate::jsonrpc::INVALID_REQUEST;
use crate::jsonrpc::JsonRpcRequest;
use crate::jsonrpc::JsonRpcResponse;
use crate::jsonrpc::McpEndpoint;
use crate::jsonrpc::PARTITION_REJECTED;
use crate::jsonrpc::SESSION_NOT_FOUND;
use crate::jsonrpc::UNAUTHENTICATED;
use crate::jsonrpc::parse_request;
use crate::partition::PARTITION_HEADER;
use crate::partition::PartitionRejection;
use crate::partition::ResolutionMode;
use crate::partition::StaticPartitionResolver;
use crate::partition::StaticWorkspace;
use crate::partition::resolve_partition_header;
use crate::session::MESSAGE_PATH;
use crate::session::SESSION_HEADER;
use crate::session::SessionFrame;
use crate::session::SessionInbox;
use crate::session::SessionMessage;
use crate::session::SessionTable;
use crate::telemetry::GatewayMetricEvent;
use crate::telemetry::GatewayMetrics;
use crate::telemetry::NoopMetrics;
use crate::telemetry::RequestOutcome;
use crate::telemetry::RouteKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Facade route path.
pub const ENTRY_PATH: &str = "/entry/mcp";
/// Full-surface route path.
pub const FULL_SURFACE_PATH: &str = "/mcp";
/// Stream-open route path.
pub const STREAM_PATH: &str = "/sse";
/// Liveness route path.
pub const HEALTH_PATH: &str = "/health";
/// Default request body limit in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Dependencies
// ============================================================================

/// Collaborators injected into the gateway.
#[derive(Clone)]
pub struct GatewayDeps {
    /// Backend registry.
    pub registry: Arc<dyn BackendRegistry>,
    /// Bearer-token validator.
    pub validator: Arc<dyn CredentialValidator>,
    /// Partition name resolver.
    pub resolver: Arc<dyn PartitionResolver>,
    /// Workspace mode.
    pub workspace: Arc<dyn ActiveWorkspace>,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
    /// Metrics sink.
    pub metrics: Arc<dyn GatewayMetrics>,
}

/// Gateway tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Default tool call timeout.
    pub call_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Shared router state.
struct GatewayState {
    /// Facade endpoint.
    entry: Arc<EntryServer>,
    /// Full-surface endpoint.
    aggregator: Arc<Aggregator>,
    /// Live streaming sessions.
    sessions: Arc<SessionTable>,
    /// Bearer-token validator.
    validator: Arc<dyn CredentialValidator>,
    /// Partition name resolver.
    resolver: Arc<dyn PartitionResolver>,
    /// Workspace mode.
    workspace: Arc<dyn ActiveWorkspace>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn GatewayMetrics>,
    /// Request body limit.
    max_body_bytes: usize,
}

/// Gateway router factory.
pub struct Gateway {
    /// Shared router state.
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Wires the endpoints over the injected collaborators.
    #[must_use]
    pub fn new(deps: GatewayDeps, settings: GatewaySettings) -> Self {
        let service = EntryService::new(Arc::clone(&deps.registry), settings.call_timeout);
        let entry = EntryServer::new(service.clone(), Arc::clone(&deps.audit));
        let aggregator = Aggregator::new(deps.registry, service);
        let state = GatewayState {
            entry: Arc::new(entry),
            aggregator: Arc::new(aggregator),
            sessions: Arc::new(SessionTable::new()),
            validator: deps.validator,
            resolver: deps.resolver,
            workspace: deps.workspace,
            audit: deps.audit,
            metrics: deps.metrics,
            max_body_bytes: settings.max_body_bytes,
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Returns the live session table.
    #[must_use]
    pub fn sessions(&self) -> Arc<SessionTable> {
        Arc::clone(&self.state.sessions)
    }

    /// Builds the HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route(ENTRY_PATH, post(handle_entry))
            .route(FULL_SURFACE_PATH, post(handle_full_surface))
            .route(STREAM_PATH, get(handle_stream_open))
            .route(MESSAGE_PATH, post(handle_stream_message))
            .route(HEALTH_PATH, get(handle_health))
            .with_state(Arc::clone(&self.state))
    }
}

// ============================================================================
// SECTION: Replies
// ============================================================================

/// HTTP reply produced by a route flow.
struct Reply {
    /// HTTP status.
    status: StatusCode,
    /// JSON-RPC envelope; `None` sends an empty body.
    envelope: Option<JsonRpcResponse>,
    /// Adds the bearer challenge header.
    challenge: bool,
}

impl Reply {
    /// Reply carrying an envelope.
    const fn envelope(status: StatusCode, envelope: JsonRpcResponse) -> Self {
        Self {
            status,
            envelope: Some(envelope),
            challenge: false,
        }
    }

    /// Reply for a dispatch result.
    fn dispatched(response: Option<JsonRpcResponse>) -> Self {
        response.map_or_else(Self::accepted, |response| Self::envelope(StatusCode::OK, response))
    }

    /// Empty `202 Accepted` reply.
    const fn accepted() -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            envelope: None,
            challenge: false,
        }
    }

    /// `401` reply for an auth failure.
    fn unauthorized(error: &AuthError) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            envelope: Some(JsonRpcResponse::failure(Value::Null, UNAUTHENTICATED, error.to_string())),
            challenge: true,
        }
    }

    /// `400` reply for an unresolvable partition.
    fn partition_rejected(id: Value, rejection: &PartitionRejection) -> Self {
        Self::envelope(
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(id, PARTITION_REJECTED, rejection.to_string()),
        )
    }

    /// Error code carried by the envelope.
    fn error_code(&self) -> Option<i64> {
        self.envelope.as_ref().and_then(|envelope| envelope.error.as_ref()).map(|error| error.code)
    }

    /// Converts into an axum response.
    fn into_response(self) -> Response {
        let mut response = match self.envelope {
            Some(envelope) => {
                let mut response = envelope.to_json_string().into_response();
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            None => Body::empty().into_response(),
        };
        *response.status_mut() = self.status;
        if self.challenge {
            response.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

// ============================================================================
// SECTION: Route Records
// ============================================================================

/// Accumulates audit and metrics fields for one routed request.
struct RouteRecord {
    /// Route the request arrived on.
    route: RouteKind,
    /// Request start.
    started: Instant,
    /// JSON-RPC method once parsed.
    method: Option<String>,
    /// Request body size.
    request_bytes: usize,
    /// Streaming session id when applicable.
    session_id: Option<String>,
    /// Effective partition scope.
    partition: Option<String>,
}

impl RouteRecord {
    /// Starts a record for a route.
    fn new(route: RouteKind) -> Self {
        Self {
            route,
            started: Instant::now(),
            method: None,
            request_bytes: 0,
            session_id: None,
            partition: None,
        }
    }

    /// Captures the effective partition.
    fn scope(&mut self, partition: Option<&PartitionId>) {
        self.partition = partition.map(|partition| partition.as_str().to_string());
    }

    /// Emits the route audit event and metrics for a finished request.
    fn finish(self, state: &GatewayState, status: StatusCode, error_code: Option<i64>) {
        let outcome = if status.is_success() && error_code.is_none() {
            RequestOutcome::Ok
        } else {
            RequestOutcome::Error
        };
        let metric = GatewayMetricEvent {
            route: self.route,
            method: self.method.clone(),
            outcome,
            error_code,
            request_bytes: self.request_bytes,
        };
        state.metrics.record_request(metric.clone());
        state.metrics.record_latency(metric, self.started.elapsed());
        let mut event = RouteAuditEvent::new(self.route, outcome, status.as_u16());
        event.method = self.method;
        event.error_code = error_code;
        event.request_bytes = self.request_bytes;
        event.session_id = self.session_id;
        event.partition = self.partition;
        state.audit.record_route(&event);
    }

    /// Finishes the record from a reply and converts the reply.
    fn respond(self, state: &GatewayState, reply: Reply) -> Response {
        self.finish(state, reply.status, reply.error_code());
        reply.into_response()
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Query parameters accepted by the stream-message route.
#[derive(Debug, Default, Deserialize)]
struct MessageQuery {
    /// Session id.
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// `POST /entry/mcp`.
async fn handle_entry(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let mut record = RouteRecord::new(RouteKind::Facade);
    let endpoint: Arc<dyn McpEndpoint> = Arc::clone(&state.entry) as Arc<dyn McpEndpoint>;
    let reply =
        post_flow(&state, &headers, body, &mut record, ResolutionMode::Lenient, endpoint).await;
    record.respond(&state, reply)
}

/// `POST /mcp`.
async fn handle_full_surface(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let mut record = RouteRecord::new(RouteKind::FullSurface);
    let endpoint: Arc<dyn McpEndpoint> = Arc::clone(&state.aggregator) as Arc<dyn McpEndpoint>;
    let reply =
        post_flow(&state, &headers, body, &mut record, ResolutionMode::Strict, endpoint).await;
    record.respond(&state, reply)
}

/// Shared request/response flow for the two POST endpoints.
async fn post_flow(
    state: &GatewayState,
    headers: &HeaderMap,
    body: Body,
    record: &mut RouteRecord,
    mode: ResolutionMode,
    endpoint: Arc<dyn McpEndpoint>,
) -> Reply {
    let auth = match authorize(state, headers, record.route).await {
        Ok(auth) => auth,
        Err(reply) => return reply,
    };
    let request = match read_request(body, state.max_body_bytes, record).await {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let partition = match resolve_partition(state, headers, mode).await {
        Ok(partition) => partition,
        Err(rejection) => return Reply::partition_rejected(request.response_id(), &rejection),
    };
    record.scope(partition.as_ref());
    let meta = CallMetadata {
        token: auth.token,
        partition,
        route: record.route,
    };
    Reply::dispatched(dispatch(endpoint, request, meta).await)
}

/// `GET /sse`.
async fn handle_stream_open(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    let mut record = RouteRecord::new(RouteKind::StreamOpen);
    if let Err(reply) = authorize(&state, &headers, record.route).await {
        return record.respond(&state, reply);
    }
    let partition = match resolve_partition(&state, &headers, ResolutionMode::Strict).await {
        Ok(partition) => partition,
        Err(rejection) => {
            return record.respond(&state, Reply::partition_rejected(Value::Null, &rejection));
        }
    };
    record.scope(partition.as_ref());
    let (session_id, stream, inbox) = state.sessions.open(partition);
    let endpoint: Arc<dyn McpEndpoint> = Arc::clone(&state.aggregator) as Arc<dyn McpEndpoint>;
    tokio::spawn(drain_session(endpoint, Arc::clone(&state.sessions), inbox));
    record.session_id = Some(session_id.as_str().to_string());
    record.finish(&state, StatusCode::OK, None);
    let events = stream.map(|frame: SessionFrame| {
        Ok::<Event, Infallible>(Event::default().event(frame.event).data(frame.data))
    });
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

/// `POST /messages`.
async fn handle_stream_message(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let mut record = RouteRecord::new(RouteKind::StreamMessage);
    let reply = stream_message_flow(&state, query, &headers, body, &mut record).await;
    record.respond(&state, reply)
}

/// Gates a stream message and queues it on the session inbox.
async fn stream_message_flow(
    state: &GatewayState,
    query: MessageQuery,
    headers: &HeaderMap,
    body: Body,
    record: &mut RouteRecord,
) -> Reply {
    let auth = match authorize(state, headers, record.route).await {
        Ok(auth) => auth,
        Err(reply) => return reply,
    };
    let session_id = query
        .session_id
        .or_else(|| header_str(headers, SESSION_HEADER).map(str::to_string))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let Some(session_id) = session_id else {
        return Reply::envelope(
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(Value::Null, INVALID_REQUEST, "missing session id"),
        );
    };
    record.session_id = Some(session_id.clone());
    let Some(handle) = state.sessions.lookup(&session_id) else {
        return Reply::envelope(
            StatusCode::NOT_FOUND,
            JsonRpcResponse::failure(Value::Null, SESSION_NOT_FOUND, "session not found"),
        );
    };
    let request = match read_request(body, state.max_body_bytes, record).await {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let partition = match resolve_partition(state, headers, ResolutionMode::Strict).await {
        Ok(Some(partition)) => Some(partition),
        Ok(None) => handle.partition.clone(),
        Err(rejection) => return Reply::partition_rejected(request.response_id(), &rejection),
    };
    record.scope(partition.as_ref());
    let meta = CallMetadata {
        token: auth.token,
        partition,
        route: record.route,
    };
    let message = SessionMessage {
        request,
        meta,
    };
    if handle.inbox.send(message).await.is_err() {
        return Reply::envelope(
            StatusCode::NOT_FOUND,
            JsonRpcResponse::failure(Value::Null, SESSION_NOT_FOUND, "session not found"),
        );
    }
    Reply::accepted()
}

/// Dispatches a session's messages one at a time, writing replies in order.
///
/// Closes the session when its stream can no longer take frames.
async fn drain_session(
    endpoint: Arc<dyn McpEndpoint>,
    sessions: Arc<SessionTable>,
    mut inbox: SessionInbox,
) {
    while let Some(message) = inbox.recv().await {
        let Some(response) = dispatch(Arc::clone(&endpoint), message.request, message.meta).await
        else {
            continue;
        };
        if !inbox.reply(SessionFrame::message(response.to_json_string())).await {
            sessions.close(inbox.id());
            return;
        }
    }
}

/// `GET /health`.
async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

// ============================================================================
// SECTION: Gates
// ============================================================================

/// Runs the auth gate and audits the decision.
async fn authorize(
    state: &GatewayState,
    headers: &HeaderMap,
    route: RouteKind,
) -> Result<AuthContext, Reply> {
    let header = headers.get(AUTHORIZATION).map(|value| value.to_str().unwrap_or_default());
    match authenticate(header, state.validator.as_ref()).await {
        Ok(auth) => {
            state.audit.record_auth(&AuthAuditEvent::allowed(route, &auth));
            Ok(auth)
        }
        Err(error) => {
            state.audit.record_auth(&AuthAuditEvent::denied(route, &error));
            Err(Reply::unauthorized(&error))
        }
    }
}

/// Resolves the partition header in the given mode.
async fn resolve_partition(
    state: &GatewayState,
    headers: &HeaderMap,
    mode: ResolutionMode,
) -> Result<Option<PartitionId>, PartitionRejection> {
    resolve_partition_header(
        header_str(headers, PARTITION_HEADER),
        mode,
        state.resolver.as_ref(),
        state.workspace.as_ref(),
    )
    .await
}

/// Reads and parses a JSON-RPC body under the size limit.
async fn read_request(
    body: Body,
    max_body_bytes: usize,
    record: &mut RouteRecord,
) -> Result<JsonRpcRequest, Reply> {
    let Ok(bytes) = to_bytes(body, max_body_bytes.saturating_add(1)).await else {
        return Err(Reply::envelope(
            StatusCode::PAYLOAD_TOO_LARGE,
            JsonRpcResponse::failure(Value::Null, BODY_TOO_LARGE, "request body too large"),
        ));
    };
    record.request_bytes = bytes.len();
    let request = parse_request(&bytes, max_body_bytes)
        .map_err(|(status, envelope)| Reply::envelope(status, envelope))?;
    record.method = Some(request.method.clone());
    Ok(request)
}

/// Returns a header as UTF-8 text.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Runs an endpoint on its own task; a panic becomes one `-32603` envelope.
async fn dispatch(
    endpoint: Arc<dyn McpEndpoint>,
    request: JsonRpcRequest,
    meta: CallMetadata,
) -> Option<JsonRpcResponse> {
    let id = request.response_id();
    let notification = request.is_notification();
    let task = tokio::spawn(async move { endpoint.handle(request, &meta).await });
    match task.await {
        Ok(response) => response,
        Err(_) if notification => None,
        Err(_) => Some(JsonRpcResponse::failure(id, INTERNAL_ERROR, "internal error")),
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Gateway server errors.
#[derive(Debug, Error)]
pub enum GatewayServerError {
    /// Configuration errors.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Collaborator construction errors.
    #[error("init error: {0}")]
    Init(String),
    /// Listener or transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Configured gateway bound to HTTP backends.
pub struct GatewayServer {
    /// Bind address.
    bind: SocketAddr,
    /// HTTP backend registry shared with the gateway.
    registry: Arc<HttpBackendRegistry>,
    /// Wired gateway.
    gateway: Gateway,
}

impl GatewayServer {
    /// Builds a server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when the configuration is invalid or a
    /// collaborator cannot be built.
    pub fn from_config(config: &ToolhubConfig) -> Result<Self, GatewayServerError> {
        config.validate()?;
        let bind = config.server.bind_addr()?;
        let registry = HttpBackendRegistry::from_config(&config.backends)
            .map_err(|err| GatewayServerError::Init(err.to_string()))?;
        let registry = Arc::new(registry);
        let audit: Arc<dyn AuditSink> = match config.audit.sink {
            AuditSinkKind::Stderr => Arc::new(StderrAuditSink),
            AuditSinkKind::None => Arc::new(NoopAuditSink),
            AuditSinkKind::File => {
                let path = config.audit.path.as_deref().ok_or_else(|| {
                    GatewayServerError::Init("audit.path is required for the file sink".to_string())
                })?;
                let sink = FileAuditSink::new(Path::new(path))
                    .map_err(|err| GatewayServerError::Init(format!("audit log: {err}")))?;
                Arc::new(sink)
            }
        };
        let deps = GatewayDeps {
            registry: Arc::clone(&registry) as Arc<dyn BackendRegistry>,
            validator: Arc::new(StaticTokenValidator::new(&config.auth.tokens)),
            resolver: Arc::new(StaticPartitionResolver::new(config.partition_map())),
            workspace: Arc::new(StaticWorkspace::new(config.workspace.remote)),
            audit,
            metrics: Arc::new(NoopMetrics),
        };
        let settings = GatewaySettings {
            max_body_bytes: config.server.max_body_bytes,
            call_timeout: config.server.call_timeout(),
        };
        Ok(Self {
            bind,
            registry,
            gateway: Gateway::new(deps, settings),
        })
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Connects backends, binds the configured address, and serves until
    /// `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError::Transport`] when binding or serving fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), GatewayServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| GatewayServerError::Transport(format!("bind {}: {err}", self.bind)))?;
        self.serve_listener(listener, shutdown).await
    }

    /// Connects backends and serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError::Transport`] when serving fails.
    pub async fn serve_listener<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), GatewayServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        for (name, err) in self.registry.connect_all().await {
            let _ = writeln!(std::io::stderr(), "toolhub: backend {name} unavailable: {err}");
        }
        let router = self.gateway.router();
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| GatewayServerError::Transport(err.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
