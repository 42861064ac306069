// crates/toolhub-gateway/src/partition.rs
// ============================================================================
// Module: Partition Gate
// Description: Partition header resolution and static collaborators.
// Purpose: Scope each request to a partition before it reaches an endpoint.
// Dependencies: toolhub-core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! The partition header carries a partition name, the `__unassigned__`
//! sentinel, or nothing. Resolution rules:
//! - absent or blank: no scope (every server visible);
//! - sentinel: the unassigned scope;
//! - remote workspace: the raw value is trusted verbatim;
//! - otherwise: the injected [`PartitionResolver`] must resolve the name.
//!
//! Strict resolution rejects unknown names; lenient resolution (facade only)
//! falls back to the raw value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use toolhub_core::ActiveWorkspace;
use toolhub_core::PartitionError;
use toolhub_core::PartitionId;
use toolhub_core::PartitionResolver;
use toolhub_core::UNASSIGNED_PARTITION;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the caller's partition name.
pub const PARTITION_HEADER: &str = "x-toolhub-project";
/// Maximum accepted partition header length.
pub const MAX_PARTITION_HEADER_BYTES: usize = 256;

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Resolution strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Unknown names are rejected.
    Strict,
    /// Unknown names fall back to the raw header value.
    Lenient,
}

/// Partition header rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid project {value}: {source}")]
pub struct PartitionRejection {
    /// Offending header value.
    pub value: String,
    /// Resolver failure.
    pub source: PartitionError,
}

/// Resolves the partition header into an effective scope.
///
/// # Errors
///
/// Returns [`PartitionRejection`] in strict mode when the name cannot be
/// resolved, or in either mode when the header exceeds the length limit.
pub async fn resolve_partition_header(
    raw: Option<&str>,
    mode: ResolutionMode,
    resolver: &dyn PartitionResolver,
    workspace: &dyn ActiveWorkspace,
) -> Result<Option<PartitionId>, PartitionRejection> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if value.len() > MAX_PARTITION_HEADER_BYTES {
        return Err(PartitionRejection {
            value: value.chars().take(32).collect(),
            source: PartitionError::NotFound("header too long".to_string()),
        });
    }
    if value == UNASSIGNED_PARTITION {
        return Ok(Some(PartitionId::unassigned()));
    }
    if workspace.is_remote() {
        return Ok(Some(PartitionId::new(value)));
    }
    match resolver.resolve(value).await {
        Ok(id) => Ok(Some(id)),
        Err(_) if mode == ResolutionMode::Lenient => Ok(Some(PartitionId::new(value))),
        Err(source) => Err(PartitionRejection {
            value: value.to_string(),
            source,
        }),
    }
}

// ============================================================================
// SECTION: Static Collaborators
// ============================================================================

/// Resolver backed by a fixed name to id map.
pub struct StaticPartitionResolver {
    /// Partition ids keyed by name.
    by_name: BTreeMap<String, PartitionId>,
}

impl StaticPartitionResolver {
    /// Builds a resolver from a name to id map.
    #[must_use]
    pub const fn new(by_name: BTreeMap<String, PartitionId>) -> Self {
        Self {
            by_name,
        }
    }
}

#[async_trait]
impl PartitionResolver for StaticPartitionResolver {
    async fn resolve(&self, name: &str) -> Result<PartitionId, PartitionError> {
        self.by_name.get(name).cloned().ok_or_else(|| PartitionError::NotFound(name.to_string()))
    }
}

/// Workspace mode fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct StaticWorkspace {
    /// Remote flag.
    remote: bool,
}

impl StaticWorkspace {
    /// Builds a workspace with the given mode.
    #[must_use]
    pub const fn new(remote: bool) -> Self {
        Self {
            remote,
        }
    }
}

impl ActiveWorkspace for StaticWorkspace {
    fn is_remote(&self) -> bool {
        self.remote
    }
}
