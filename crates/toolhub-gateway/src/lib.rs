// crates/toolhub-gateway/src/lib.rs
// ============================================================================
// Module: Toolhub Gateway Library
// Description: Authenticated MCP gateway over a pool of backend tool servers.
// Purpose: Expose the router, endpoints, gates, and shipped collaborators.
// Dependencies: toolhub-core, toolhub-config, axum, reqwest, tokio
// ============================================================================

//! ## Overview
//! The gateway fronts many backend MCP servers with one authenticated HTTP
//! surface. Callers either use the two-tool entry facade (`/entry/mcp`) or
//! the full aggregated surface (`/mcp`, plus the `/sse` and `/messages`
//! streaming pair). Every route passes the bearer-token gate; partition
//! scoping narrows which backend servers a caller can see.
//!
//! Collaborators (backend registry, credential validator, partition resolver,
//! workspace mode, audit sink, metrics) are injected through
//! [`GatewayDeps`]; nothing is reached through global state.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod aggregator;
pub mod audit;
pub mod auth;
pub mod backend_http;
pub mod entry_server;
pub mod entry_service;
pub mod jsonrpc;
pub mod partition;
pub mod server;
pub mod session;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aggregator::Aggregator;
pub use audit::AuditSink;
pub use audit::CallOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RequestLogEntry;
pub use audit::RouteAuditEvent;
pub use audit::StderrAuditSink;
pub use auth::AuthAuditEvent;
pub use auth::AuthContext;
pub use auth::AuthError;
pub use auth::StaticTokenValidator;
pub use backend_http::HttpBackendRegistry;
pub use backend_http::HttpBackendSpec;
pub use entry_server::EntryServer;
pub use entry_service::EntryErrorCode;
pub use entry_service::EntryService;
pub use entry_service::ServerToolsListing;
pub use entry_service::ToolCallOutcome;
pub use entry_service::ToolCallRequest;
pub use jsonrpc::CallMetadata;
pub use jsonrpc::JsonRpcRequest;
pub use jsonrpc::JsonRpcResponse;
pub use jsonrpc::McpEndpoint;
pub use partition::PARTITION_HEADER;
pub use partition::StaticPartitionResolver;
pub use partition::StaticWorkspace;
pub use server::Gateway;
pub use server::GatewayDeps;
pub use server::GatewayServer;
pub use server::GatewayServerError;
pub use server::GatewaySettings;
pub use session::SESSION_HEADER;
pub use session::SessionTable;
pub use telemetry::GatewayMetrics;
pub use telemetry::NoopMetrics;
