// crates/toolhub-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Entry Point Tests
// Description: Unit tests for argument parsing and config validation.
// Purpose: Ensure the command surface parses as documented.
// Dependencies: toolhub-cli main, clap
// ============================================================================

//! ## Overview
//! Parses representative command lines and validates config files on disk.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::CommandFactory;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::ConfigValidateCommand;
use super::DEFAULT_FACADE_URL;
use super::command_config_validate;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes `content` to a unique temp file.
fn temp_config(label: &str, content: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock drift").as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("toolhub-cli-{label}-{nanos}.toml"));
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn bridge_defaults_to_local_facade() {
    let cli = Cli::try_parse_from(["toolhub", "bridge", "--project", "alpha"]).unwrap();
    let Commands::Bridge(command) = cli.command else {
        panic!("expected bridge command");
    };
    assert_eq!(command.project, "alpha");
    assert_eq!(command.url, DEFAULT_FACADE_URL);
}

#[test]
fn bridge_requires_project() {
    assert!(Cli::try_parse_from(["toolhub", "bridge"]).is_err());
}

#[test]
fn serve_accepts_config_path() {
    let cli = Cli::try_parse_from(["toolhub", "serve", "--config", "gateway.toml"]).unwrap();
    let Commands::Serve(command) = cli.command else {
        panic!("expected serve command");
    };
    assert_eq!(command.config, Some(PathBuf::from("gateway.toml")));
}

#[test]
fn config_validate_parses() {
    let cli = Cli::try_parse_from(["toolhub", "config", "validate", "--config", "x.toml"]).unwrap();
    let Commands::Config {
        command: ConfigCommand::Validate(command),
    } = cli.command
    else {
        panic!("expected config validate command");
    };
    assert_eq!(command.config, Some(PathBuf::from("x.toml")));
}

// ============================================================================
// SECTION: Config Validation
// ============================================================================

#[test]
fn validate_accepts_minimal_config() {
    let path = temp_config("valid", "[auth]\ntokens = [\"secret-token\"]\n");
    let command = ConfigValidateCommand {
        config: Some(path.clone()),
    };
    let code = command_config_validate(&command).unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    let _ = fs::remove_file(path);
}

#[test]
fn validate_rejects_config_without_tokens() {
    let path = temp_config("invalid", "[auth]\ntokens = []\n");
    let command = ConfigValidateCommand {
        config: Some(path.clone()),
    };
    let err = command_config_validate(&command).unwrap_err();
    assert!(err.to_string().starts_with("failed to load config"));
    let _ = fs::remove_file(path);
}
