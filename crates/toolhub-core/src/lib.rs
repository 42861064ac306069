// crates/toolhub-core/src/lib.rs
// ============================================================================
// Module: Toolhub Core Library
// Description: Public API surface for the Toolhub core.
// Purpose: Expose shared descriptors, content items, and collaborator interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Toolhub core holds the data model shared by the gateway and its
//! collaborators: partition identifiers, backend server and tool descriptors,
//! normalized tool-call content, and the async interfaces the gateway consumes
//! (backend registry, credential validator, partition resolver, workspace
//! mode). It carries no transport code.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ActiveWorkspace;
pub use interfaces::BackendError;
pub use interfaces::BackendRegistry;
pub use interfaces::CallOptions;
pub use interfaces::CredentialValidator;
pub use interfaces::DEFAULT_CALL_TIMEOUT;
pub use interfaces::PartitionError;
pub use interfaces::PartitionResolver;
pub use interfaces::TokenValidation;
