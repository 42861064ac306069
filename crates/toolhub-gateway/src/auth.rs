// crates/toolhub-gateway/src/auth.rs
// ============================================================================
// Module: Gateway Authentication
// Description: Bearer-token auth gate and the static token validator.
// Purpose: Reject unauthenticated requests before any business logic runs.
// Dependencies: toolhub-core, async-trait, serde, subtle, thiserror
// ============================================================================

//! ## Overview
//! Every gateway route (except health) passes through [`authenticate`]: the
//! `Authorization` header must carry a `Bearer` token, and the injected
//! [`CredentialValidator`] must accept it. Auth state is computed per request
//! and never cached. Audit events carry a SHA-256 fingerprint, never the token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Serialize;
use subtle::Choice;
use subtle::ConstantTimeEq;
use thiserror::Error;
use toolhub_core::CredentialValidator;
use toolhub_core::TokenValidation;
use toolhub_core::token_fingerprint;

use crate::audit::now_ms;
use crate::telemetry::RouteKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header size in bytes.
pub const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authenticated caller.
#[derive(Clone)]
pub struct AuthContext {
    /// Bearer token as presented.
    pub token: String,
    /// SHA-256 fingerprint of the token.
    pub fingerprint: String,
}

/// Authentication failures.
///
/// # Invariants
/// - Every variant maps to HTTP 401 with `WWW-Authenticate: Bearer`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header.
    #[error("missing authorization")]
    Missing,
    /// Header present but not a usable bearer credential.
    #[error("{0}")]
    Malformed(&'static str),
    /// The validator rejected the token.
    #[error("{0}")]
    Rejected(String),
}

impl AuthError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed(_) => "malformed",
            Self::Rejected(_) => "rejected",
        }
    }
}

// ============================================================================
// SECTION: Auth Gate
// ============================================================================

/// Authenticates a request from its `Authorization` header.
///
/// # Errors
///
/// Returns [`AuthError`] when the header is missing, malformed, or the token
/// is rejected by the validator.
pub async fn authenticate(
    auth_header: Option<&str>,
    validator: &dyn CredentialValidator,
) -> Result<AuthContext, AuthError> {
    let token = parse_bearer_token(auth_header)?;
    let validation = validator.validate(&token).await;
    if !validation.valid {
        let reason = validation.error.unwrap_or_else(|| "invalid bearer token".to_string());
        return Err(AuthError::Rejected(reason));
    }
    let fingerprint = token_fingerprint(&token);
    Ok(AuthContext {
        token,
        fingerprint,
    })
}

/// Extracts the bearer token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`AuthError`] when the header is absent, oversized, uses another
/// scheme, or carries an empty token.
pub fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header.ok_or(AuthError::Missing)?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Malformed("authorization header too large"));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Malformed("invalid authorization header"));
    }
    Ok(token.to_string())
}

// ============================================================================
// SECTION: Static Validator
// ============================================================================

/// Validator accepting a fixed set of tokens.
///
/// # Invariants
/// - Every configured token is compared in constant time on each call.
pub struct StaticTokenValidator {
    /// Accepted tokens.
    tokens: Vec<Vec<u8>>,
}

impl StaticTokenValidator {
    /// Builds a validator from accepted tokens.
    #[must_use]
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens.into_iter().map(|token| token.as_ref().as_bytes().to_vec()).collect(),
        }
    }
}

#[async_trait]
impl CredentialValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> TokenValidation {
        let presented = token.as_bytes();
        let matched = self
            .tokens
            .iter()
            .fold(Choice::from(0), |acc, accepted| acc | accepted.as_slice().ct_eq(presented));
        if bool::from(matched) {
            TokenValidation::accepted()
        } else {
            TokenValidation::rejected("invalid bearer token")
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Auth decision audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    timestamp_ms: u128,
    /// Decision outcome.
    decision: &'static str,
    /// Route the request arrived on.
    route: RouteKind,
    /// Bearer token fingerprint (sha256).
    token_fingerprint: Option<String>,
    /// Failure label (for deny events).
    failure: Option<&'static str>,
    /// Failure reason (for deny events).
    reason: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(route: RouteKind, auth: &AuthContext) -> Self {
        Self {
            event: "gateway_auth",
            timestamp_ms: now_ms(),
            decision: "allow",
            route,
            token_fingerprint: Some(auth.fingerprint.clone()),
            failure: None,
            reason: None,
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(route: RouteKind, error: &AuthError) -> Self {
        Self {
            event: "gateway_auth",
            timestamp_ms: now_ms(),
            decision: "deny",
            route,
            token_fingerprint: None,
            failure: Some(error.label()),
            reason: Some(error.to_string()),
        }
    }

    /// Returns the decision label.
    #[must_use]
    pub const fn decision(&self) -> &'static str {
        self.decision
    }
}
