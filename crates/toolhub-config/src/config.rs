// crates/toolhub-config/src/config.rs
// ============================================================================
// Module: Toolhub Configuration
// Description: Configuration loading and validation for the Toolhub gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: toolhub-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: the gateway refuses to start
//! rather than serve with partially understood settings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use toolhub_core::PartitionId;
use toolhub_core::UNASSIGNED_PARTITION;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "toolhub.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TOOLHUB_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of auth tokens.
pub(crate) const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of an auth token.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Maximum number of configured backends.
pub(crate) const MAX_BACKENDS: usize = 256;
/// Maximum number of configured partitions.
pub(crate) const MAX_PARTITIONS: usize = 256;
/// Maximum length of backend and partition names.
pub(crate) const MAX_NAME_LENGTH: usize = 128;
/// Default bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8765";
/// Default maximum request body size.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default tool-call timeout (30 minutes).
const DEFAULT_CALL_TIMEOUT_MS: u64 = 30 * 60 * 1000;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root configuration for the Toolhub gateway.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolhubConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Caller authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Active workspace mode.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// Audit logging settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Declared partitions (name to canonical id).
    #[serde(default)]
    pub partitions: Vec<PartitionConfig>,
    /// Backend tool servers.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl ToolhubConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from the argument, then from `TOOLHUB_CONFIG`, then
    /// defaults to `toolhub.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = Self::from_toml_str(content)?;
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.audit.validate()?;
        let partition_ids = self.validate_partitions()?;
        self.validate_backends(&partition_ids)?;
        Ok(())
    }

    /// Validates partitions and returns the declared ids.
    fn validate_partitions(&self) -> Result<BTreeSet<&str>, ConfigError> {
        if self.partitions.len() > MAX_PARTITIONS {
            return Err(ConfigError::Invalid("too many partitions".to_string()));
        }
        let mut names = BTreeSet::new();
        let mut ids = BTreeSet::new();
        for partition in &self.partitions {
            validate_name("partitions.name", &partition.name)?;
            validate_name("partitions.id", &partition.id)?;
            if partition.name == UNASSIGNED_PARTITION || partition.id == UNASSIGNED_PARTITION {
                return Err(ConfigError::Invalid(format!(
                    "partition must not use reserved value {UNASSIGNED_PARTITION}"
                )));
            }
            if !names.insert(partition.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate partition name: {}",
                    partition.name
                )));
            }
            if !ids.insert(partition.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate partition id: {}",
                    partition.id
                )));
            }
        }
        Ok(ids)
    }

    /// Validates backends against the declared partition ids.
    fn validate_backends(&self, partition_ids: &BTreeSet<&str>) -> Result<(), ConfigError> {
        if self.backends.len() > MAX_BACKENDS {
            return Err(ConfigError::Invalid("too many backends".to_string()));
        }
        let mut names = BTreeSet::new();
        for backend in &self.backends {
            backend.validate()?;
            if !names.insert(backend.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate backend name: {}",
                    backend.name
                )));
            }
            if let Some(partition) = &backend.partition
                && !partition_ids.contains(partition.as_str())
            {
                return Err(ConfigError::Invalid(format!(
                    "backend {} references undeclared partition {partition}",
                    backend.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the partition name to id map.
    #[must_use]
    pub fn partition_map(&self) -> BTreeMap<String, PartitionId> {
        self.partitions
            .iter()
            .map(|partition| (partition.name.clone(), PartitionId::new(partition.id.clone())))
            .collect()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (`host:port`).
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Default tool-call timeout in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Permit binding to non-loopback addresses.
    #[serde(default)]
    pub allow_non_loopback: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            call_timeout_ms: default_call_timeout_ms(),
            allow_non_loopback: false,
        }
    }
}

impl ServerConfig {
    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "call_timeout_ms must be greater than zero".to_string(),
            ));
        }
        let addr = self.bind_addr()?;
        if !addr.ip().is_loopback() && !self.allow_non_loopback {
            return Err(ConfigError::Invalid(
                "non-loopback bind disallowed without allow_non_loopback".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Returns the default tool-call timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

// ============================================================================
// SECTION: Auth
// ============================================================================

/// Caller authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Accepted bearer tokens.
    #[serde(default)]
    pub tokens: Vec<String>,
}

impl AuthConfig {
    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.is_empty() {
            return Err(ConfigError::Invalid("auth.tokens must not be empty".to_string()));
        }
        if self.tokens.len() > MAX_AUTH_TOKENS {
            return Err(ConfigError::Invalid("too many auth tokens".to_string()));
        }
        let mut seen = BTreeSet::new();
        for token in &self.tokens {
            if token.trim().is_empty() {
                return Err(ConfigError::Invalid("auth token must be non-empty".to_string()));
            }
            if token.len() > MAX_AUTH_TOKEN_LENGTH {
                return Err(ConfigError::Invalid("auth token too long".to_string()));
            }
            if token.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(
                    "auth token must not contain whitespace".to_string(),
                ));
            }
            if !seen.insert(token.as_str()) {
                return Err(ConfigError::Invalid("duplicate auth token".to_string()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Workspace
// ============================================================================

/// Active workspace configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Trust caller partition headers verbatim.
    #[serde(default)]
    pub remote: bool,
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// Append-only JSON lines file.
    File,
    /// Discard audit events.
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// File path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => validate_path_string("audit.path", path),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Partitions
// ============================================================================

/// Declared partition ("project").
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PartitionConfig {
    /// Caller-facing partition name.
    pub name: String,
    /// Canonical partition id.
    pub id: String,
}

// ============================================================================
// SECTION: Backends
// ============================================================================

/// Backend tool server reachable over MCP streamable HTTP.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Unique backend name.
    pub name: String,
    /// Endpoint URL (http or https).
    pub url: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning partition id; absent means unassigned.
    #[serde(default)]
    pub partition: Option<String>,
    /// Operator disable flag.
    #[serde(default)]
    pub disabled: bool,
    /// Optional bearer token sent to the backend.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Per-tool enable map.
    #[serde(default)]
    pub tool_permissions: BTreeMap<String, bool>,
}

impl BackendConfig {
    /// Validates a single backend entry.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("backends.name", &self.name)?;
        let url = Url::parse(&self.url).map_err(|err| {
            ConfigError::Invalid(format!("backend {} has invalid url: {err}", self.name))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "backend {} url must use http or https",
                self.name
            )));
        }
        if let Some(token) = &self.bearer_token
            && (token.trim().is_empty() || token.len() > MAX_AUTH_TOKEN_LENGTH)
        {
            return Err(ConfigError::Invalid(format!(
                "backend {} bearer_token is invalid",
                self.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default call timeout.
const fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    validate_path(Path::new(trimmed))
        .map_err(|_| ConfigError::Invalid(format!("{field} exceeds path limits")))
}

/// Validates a backend or partition name.
fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} too long")));
    }
    if value.trim() != value {
        return Err(ConfigError::Invalid(format!(
            "{field} must not have surrounding whitespace"
        )));
    }
    Ok(())
}
