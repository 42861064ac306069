// crates/toolhub-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for toolhub-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use toolhub_config::ToolhubConfig;

/// Minimal valid configuration text.
pub const MINIMAL_TOML: &str = r#"
[auth]
tokens = ["secret-token"]
"#;

/// Parses a TOML string into a `ToolhubConfig` without validation.
pub fn config_from_toml(toml_str: &str) -> Result<ToolhubConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config that passes validation.
pub fn minimal_config() -> Result<ToolhubConfig, toml::de::Error> {
    config_from_toml(MINIMAL_TOML)
}
