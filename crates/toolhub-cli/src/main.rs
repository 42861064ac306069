// crates/toolhub-cli/src/main.rs
// ============================================================================
// Module: Toolhub CLI Entry Point
// Description: Command dispatcher for the gateway server and stdio bridge.
// Purpose: Run, validate, and connect to a Toolhub gateway from the shell.
// Dependencies: clap, tokio, toolhub-config, toolhub-gateway, thiserror.
// ============================================================================

//! ## Overview
//! `toolhub serve` loads configuration, connects backends, and serves until
//! Ctrl-C. `toolhub bridge` relays stdio JSON-RPC to a running gateway's
//! facade. `toolhub config validate` checks a configuration file and exits.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub(crate) mod bridge;
#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use toolhub_config::ToolhubConfig;
use toolhub_gateway::GatewayServer;

use crate::bridge::Bridge;
use crate::bridge::BridgeConfig;
use crate::bridge::DEFAULT_FACADE_URL;
use crate::bridge::TOKEN_ENV;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "toolhub", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve(ServeCommand),
    /// Relay stdio JSON-RPC to a running gateway.
    Bridge(BridgeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config file path (defaults to `TOOLHUB_CONFIG` or `toolhub.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `bridge`.
#[derive(Args, Debug)]
struct BridgeCommand {
    /// Project name sent with every request.
    #[arg(long, value_name = "NAME")]
    project: String,
    /// Facade endpoint URL.
    #[arg(long, value_name = "URL", default_value = DEFAULT_FACADE_URL)]
    url: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to `TOOLHUB_CONFIG` or `toolhub.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error surfaced to the user.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Bridge(command) => command_bridge(command).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = ToolhubConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let server = GatewayServer::from_config(&config)
        .map_err(|err| CliError::new(format!("failed to initialize gateway: {err}")))?;
    write_stderr_line(&format!("toolhub: listening on {}", server.bind_addr()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server
        .serve(shutdown_signal())
        .await
        .map_err(|err| CliError::new(format!("gateway failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `bridge` command.
async fn command_bridge(command: BridgeCommand) -> CliResult<ExitCode> {
    let token = std::env::var(TOKEN_ENV)
        .map_err(|_| CliError::new(format!("{TOKEN_ENV} must be set")))?;
    let bridge = Bridge::new(BridgeConfig {
        endpoint: command.url,
        project: command.project,
        token,
    })
    .map_err(|err| CliError::new(err.to_string()))?;
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    bridge.run(input, tokio::io::stdout()).await.map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = ToolhubConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&format!(
        "config ok: {} backend(s), {} partition(s)",
        config.backends.len(),
        config.partitions.len()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
