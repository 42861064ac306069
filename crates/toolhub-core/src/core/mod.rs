// crates/toolhub-core/src/core/mod.rs
// ============================================================================
// Module: Toolhub Core Types
// Description: Data model shared across the gateway and collaborators.
// Purpose: Group identifiers, descriptors, content, and hashing helpers.
// Dependencies: serde, sha2
// ============================================================================

//! Core data types for Toolhub.

pub mod content;
pub mod descriptors;
pub mod hashing;
pub mod identifiers;

pub use content::ContentItem;
pub use content::NormalizedOutput;
pub use content::normalize_tool_output;
pub use descriptors::RuntimeStatus;
pub use descriptors::ServerDescriptor;
pub use descriptors::ToolDescriptor;
pub use hashing::token_fingerprint;
pub use identifiers::PartitionId;
pub use identifiers::UNASSIGNED_PARTITION;
