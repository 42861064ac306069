// crates/toolhub-config/src/lib.rs
// ============================================================================
// Module: Toolhub Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for toolhub.toml semantics.
// Dependencies: toolhub-core, serde, toml
// ============================================================================

//! ## Overview
//! `toolhub-config` defines the configuration model for the Toolhub gateway
//! and its fail-closed validation. Config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
