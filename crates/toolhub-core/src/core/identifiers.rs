// crates/toolhub-core/src/core/identifiers.rs
// ============================================================================
// Module: Toolhub Identifiers
// Description: Canonical opaque identifiers used by the gateway.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Partition identifiers are opaque strings produced by the partition
//! resolver (or, in remote workspaces, taken verbatim from the caller). The
//! `__unassigned__` sentinel is a reserved identifier that selects servers
//! without a partition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reserved partition value selecting servers that belong to no partition.
pub const UNASSIGNED_PARTITION: &str = "__unassigned__";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Canonical partition ("project") identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    /// Creates a new partition identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the reserved "unassigned" partition identifier.
    #[must_use]
    pub fn unassigned() -> Self {
        Self(UNASSIGNED_PARTITION.to_string())
    }

    /// Returns true when this identifier is the unassigned sentinel.
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.0 == UNASSIGNED_PARTITION
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PartitionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PartitionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
