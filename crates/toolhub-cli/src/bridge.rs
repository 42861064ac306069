// crates/toolhub-cli/src/bridge.rs
// ============================================================================
// Module: Stdio Bridge
// Description: Forwards newline-delimited JSON-RPC from stdio to the facade.
// Purpose: Let stdio-only MCP clients reach a running gateway.
// Dependencies: reqwest, serde_json, tokio, toolhub-gateway
// ============================================================================

//! ## Overview
//! Each non-empty input line is posted to the facade endpoint with the bearer
//! token and project header. Non-empty reply bodies are written back as one
//! line each; `202 Accepted` replies to notifications write nothing. When the
//! gateway is unreachable, requests carrying an id receive a synthesized
//! internal-error envelope so the client does not hang.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use toolhub_gateway::PARTITION_HEADER;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the gateway bearer token.
pub const TOKEN_ENV: &str = "TOOLHUB_TOKEN";
/// Facade endpoint used when `--url` is absent.
pub const DEFAULT_FACADE_URL: &str = "http://127.0.0.1:8765/entry/mcp";
/// Connect timeout toward the gateway. Replies have no total deadline; the
/// gateway bounds tool calls with its own progress-aware timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// JSON-RPC internal error code.
const INTERNAL_ERROR: i64 = -32603;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Bridge connection settings.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Facade endpoint URL.
    pub endpoint: String,
    /// Project name sent in the partition header.
    pub project: String,
    /// Gateway bearer token.
    pub token: String,
}

/// Bridge failures.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid bridge settings.
    #[error("bridge config error: {0}")]
    Config(String),
    /// Reading stdin or writing stdout failed.
    #[error("bridge io error: {0}")]
    Io(String),
    /// The gateway could not be reached.
    #[error("gateway request failed: {0}")]
    Transport(String),
}

/// Stdio-to-HTTP forwarder.
pub struct Bridge {
    /// HTTP client.
    client: Client,
    /// Facade endpoint URL.
    endpoint: String,
    /// Headers sent with every request.
    headers: HeaderMap,
}

// ============================================================================
// SECTION: Bridge
// ============================================================================

impl Bridge {
    /// Builds a bridge from settings.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when the token or project cannot be
    /// sent as a header, or the HTTP client cannot be built.
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        if config.token.trim().is_empty() {
            return Err(BridgeError::Config(format!("{TOKEN_ENV} must be set")));
        }
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| BridgeError::Config("invalid bearer token header".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        let project = HeaderValue::from_str(&config.project)
            .map_err(|_| BridgeError::Config("invalid project header".to_string()))?;
        headers.insert(PARTITION_HEADER, project);
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(Policy::none())
            .build()
            .map_err(|err| BridgeError::Config(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint,
            headers,
        })
    }

    /// Forwards lines from `input` until EOF, writing replies to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Io`] when reading or writing fails.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<(), BridgeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await.map_err(|err| BridgeError::Io(err.to_string()))? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let reply = match self.forward(line).await {
                Ok(reply) => reply,
                Err(err) => transport_failure(line, &err),
            };
            if let Some(reply) = reply {
                output
                    .write_all(reply.as_bytes())
                    .await
                    .map_err(|err| BridgeError::Io(err.to_string()))?;
                output.write_all(b"\n").await.map_err(|err| BridgeError::Io(err.to_string()))?;
                output.flush().await.map_err(|err| BridgeError::Io(err.to_string()))?;
            }
        }
        Ok(())
    }

    /// Posts one message; returns the reply body when non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] when the gateway is unreachable.
    pub async fn forward(&self, line: &str) -> Result<Option<String>, BridgeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .body(line.to_string())
            .send()
            .await
            .map_err(|err| BridgeError::Transport(err.to_string()))?;
        let body = response.text().await.map_err(|err| BridgeError::Transport(err.to_string()))?;
        let body = body.trim();
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(body.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the error reply for a message that could not be delivered.
///
/// Notifications (no `id` member) and unparseable lines get no reply; an
/// explicit `null` id is answered.
fn transport_failure(line: &str, err: &BridgeError) -> Option<String> {
    let message: Value = serde_json::from_str(line).ok()?;
    let id = message.get("id")?.clone();
    let envelope = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": INTERNAL_ERROR, "message": err.to_string()}
    });
    Some(envelope.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
