// crates/toolhub-gateway/src/audit.rs
// ============================================================================
// Module: Gateway Audit Logging
// Description: Structured request-log and route audit events.
// Purpose: Emit JSON-line logs without a hard logging-framework dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every facade tool call is mirrored to an [`AuditSink`] as a
//! `request_log` event; every routed request produces a `gateway_request`
//! event; auth decisions produce `gateway_auth` events. Sinks swallow their
//! own I/O failures so logging can never change a response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;

use crate::auth::AuthAuditEvent;
use crate::telemetry::RequestOutcome;
use crate::telemetry::RouteKind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome label for request-log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// Call produced a non-error result.
    Success,
    /// Call produced an error result.
    Error,
}

/// Request-log entry for one handled facade tool call.
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation name, qualified with server and tool when applicable.
    pub operation: String,
    /// Call parameters as received.
    pub params: Value,
    /// Call outcome.
    pub outcome: CallOutcome,
    /// Error message when the call failed.
    pub error_message: Option<String>,
    /// Machine-readable error code when the call failed.
    pub error_code: Option<String>,
    /// Elapsed handling time in milliseconds.
    pub elapsed_ms: u128,
    /// Partition scope of the caller.
    pub partition: Option<String>,
}

impl RequestLogEntry {
    /// Creates a request-log entry with a consistent timestamp.
    #[must_use]
    pub fn new(operation: String, params: Value, outcome: CallOutcome, elapsed_ms: u128) -> Self {
        Self {
            event: "request_log",
            timestamp_ms: now_ms(),
            operation,
            params,
            outcome,
            error_message: None,
            error_code: None,
            elapsed_ms,
            partition: None,
        }
    }
}

/// Route-level audit event for one gateway request.
#[derive(Debug, Clone, Serialize)]
pub struct RouteAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Route the request arrived on.
    pub route: RouteKind,
    /// JSON-RPC method when parsed.
    pub method: Option<String>,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status returned on the request.
    pub status: u16,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Streaming session identifier when applicable.
    pub session_id: Option<String>,
    /// Effective partition scope.
    pub partition: Option<String>,
}

impl RouteAuditEvent {
    /// Creates a route audit event with a consistent timestamp.
    #[must_use]
    pub fn new(route: RouteKind, outcome: RequestOutcome, status: u16) -> Self {
        Self {
            event: "gateway_request",
            timestamp_ms: now_ms(),
            route,
            method: None,
            outcome,
            status,
            error_code: None,
            request_bytes: 0,
            session_id: None,
            partition: None,
        }
    }
}

/// Returns the current time in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |duration| duration.as_millis())
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for gateway events.
pub trait AuditSink: Send + Sync {
    /// Records a facade request-log entry.
    fn record_request(&self, entry: &RequestLogEntry);

    /// Records a route audit event.
    fn record_route(&self, _event: &RouteAuditEvent) {}

    /// Records an auth decision.
    fn record_auth(&self, _event: &AuthAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event to stderr.
    fn emit(payload: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(payload) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_request(&self, entry: &RequestLogEntry) {
        Self::emit(entry);
    }

    fn record_route(&self, event: &RouteAuditEvent) {
        Self::emit(event);
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn emit(&self, payload: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(payload)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_request(&self, entry: &RequestLogEntry) {
        self.emit(entry);
    }

    fn record_route(&self, event: &RouteAuditEvent) {
        self.emit(event);
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_request(&self, _entry: &RequestLogEntry) {}
}
