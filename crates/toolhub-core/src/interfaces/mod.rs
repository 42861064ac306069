// crates/toolhub-core/src/interfaces/mod.rs
// ============================================================================
// Module: Toolhub Interfaces
// Description: Collaborator interfaces consumed by the gateway.
// Purpose: Define the backend registry, credential, partition, and workspace seams.
// Dependencies: crate::core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! The gateway never reaches collaborators through global accessors. Each one
//! is an interface injected once at construction: the backend registry that
//! owns tool servers, the credential validator, the partition resolver, and
//! the active-workspace mode flag. Implementations receive untrusted caller
//! input and must fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::descriptors::ServerDescriptor;
use crate::core::descriptors::ToolDescriptor;
use crate::core::identifiers::PartitionId;

// ============================================================================
// SECTION: Backend Registry
// ============================================================================

/// Default tool-call timeout (30 minutes).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Options for a single tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    /// Idle deadline for the call.
    pub timeout: Duration,
    /// Restart the deadline whenever the backend reports progress.
    pub reset_timeout_on_progress: bool,
}

impl CallOptions {
    /// Builds options with the given timeout and progress reset enabled.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            reset_timeout_on_progress: true,
        }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_CALL_TIMEOUT)
    }
}

/// Backend registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Display strings are relayed to callers as `CALL_FAILED` text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// No connection exists for the named server.
    #[error("server {0} is not connected")]
    NotConnected(String),
    /// The call exceeded its deadline.
    #[error("request timed out after {0} ms")]
    Timeout(u128),
    /// Transport failure talking to the backend.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with an unusable payload.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The backend returned a JSON-RPC error.
    #[error("backend error {code}: {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Backend error message.
        message: String,
    },
}

/// Live registry of backend tool servers.
#[async_trait]
pub trait BackendRegistry: Send + Sync {
    /// Returns a snapshot of every known backend server.
    async fn servers(&self) -> Vec<ServerDescriptor>;

    /// Fetches the live tool list of a server.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the server cannot be queried.
    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, BackendError>;

    /// Invokes a tool on a named server and returns the raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the invocation fails or times out.
    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
        options: CallOptions,
    ) -> Result<Value, BackendError>;
}

// ============================================================================
// SECTION: Credential Validator
// ============================================================================

/// Result of validating a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenValidation {
    /// True when the token is accepted.
    pub valid: bool,
    /// Optional rejection reason.
    pub error: Option<String>,
}

impl TokenValidation {
    /// Accepting validation.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    /// Rejecting validation with a reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }
}

/// Validates caller bearer tokens.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    /// Validates a bearer token.
    async fn validate(&self, token: &str) -> TokenValidation;
}

// ============================================================================
// SECTION: Partition Resolver
// ============================================================================

/// Partition resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    /// No partition carries the requested name.
    #[error("project not found: {0}")]
    NotFound(String),
    /// The resolver could not answer.
    #[error("project lookup failed: {0}")]
    Unavailable(String),
}

/// Resolves partition names to canonical identifiers.
#[async_trait]
pub trait PartitionResolver: Send + Sync {
    /// Resolves a partition name.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError`] when the name is unknown or the lookup fails.
    async fn resolve(&self, name: &str) -> Result<PartitionId, PartitionError>;
}

// ============================================================================
// SECTION: Active Workspace
// ============================================================================

/// Reports the mode of the active workspace.
pub trait ActiveWorkspace: Send + Sync {
    /// Returns true when the active workspace is remote.
    fn is_remote(&self) -> bool;
}
