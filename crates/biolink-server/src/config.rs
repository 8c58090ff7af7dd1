//! Server configuration loading from file and environment variables.

use biolink_db::DbRuntimeSettings;
use biolink_types::{RetentionPolicy, DEFAULT_RETENTION_DAYS};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Access control settings.
    #[serde(default)]
    pub access: AccessConfig,

    /// Analytics retention settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// How long a request waits for a pooled connection, in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "biolink_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Which paths the access gate protects and how it answers.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Page prefixes. Denials redirect.
    #[serde(default = "default_ui_prefixes")]
    pub ui_prefixes: Vec<String>,

    /// API prefixes. Denials return 401/403 JSON.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Name of the cookie carrying the session credential.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Where unauthenticated page requests are sent.
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,

    /// Where authenticated but unauthorized page requests are sent.
    #[serde(default = "default_denied_redirect")]
    pub denied_redirect: String,

    /// Upper bound on one identity lookup, in milliseconds.
    #[serde(default = "default_identity_timeout_ms")]
    pub identity_timeout_ms: u64,
}

/// Analytics retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Days to keep events. Must be positive.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Seconds between background sweeps; 0 disables the background task.
    #[serde(default)]
    pub sweep_interval_seconds: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "biolink.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_connection_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ui_prefixes() -> Vec<String> {
    vec!["/admin".to_string()]
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/admin".to_string()]
}

fn default_session_cookie() -> String {
    "biolink_session".to_string()
}

fn default_sign_in_path() -> String {
    "/sign-in".to_string()
}

fn default_denied_redirect() -> String {
    "/".to_string()
}

fn default_identity_timeout_ms() -> u64 {
    2_000
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            connection_timeout_ms: default_connection_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    /// Pool tunables derived from this section.
    pub fn runtime_settings(&self) -> DbRuntimeSettings {
        DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
            connection_timeout_ms: self.connection_timeout_ms,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            ui_prefixes: default_ui_prefixes(),
            api_prefixes: default_api_prefixes(),
            session_cookie: default_session_cookie(),
            sign_in_path: default_sign_in_path(),
            denied_redirect: default_denied_redirect(),
            identity_timeout_ms: default_identity_timeout_ms(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            sweep_interval_seconds: 0,
        }
    }
}

impl AnalyticsConfig {
    /// The validated retention policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when `retention_days` is not positive or
    /// exceeds the retention ceiling.
    pub fn retention_policy(&self) -> Result<RetentionPolicy, ConfigError> {
        RetentionPolicy::new(self.retention_days)
            .map_err(|e| ConfigError::Invalid(format!("analytics.retention_days: {e}")))
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not acceptable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `BIOLINK_HOST` overrides `server.host`
/// - `BIOLINK_PORT` overrides `server.port`
/// - `BIOLINK_DB_PATH` overrides `database.path`
/// - `BIOLINK_LOG_LEVEL` overrides `logging.level`
/// - `BIOLINK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `BIOLINK_RETENTION_DAYS` overrides `analytics.retention_days`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if `analytics.retention_days` is not a positive integer.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => parse_config(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("BIOLINK_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("BIOLINK_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("BIOLINK_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("BIOLINK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("BIOLINK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    // A bad retention override must not silently fall back to the file value.
    if let Ok(days) = std::env::var("BIOLINK_RETENTION_DAYS") {
        config.analytics.retention_days = days.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!("BIOLINK_RETENTION_DAYS is not an integer: {days}"))
        })?;
    }

    config.analytics.retention_policy()?;
    Ok(config)
}

/// Parses configuration from TOML text without consulting the environment.
///
/// # Errors
///
/// Returns `ConfigError::Parse` for malformed TOML.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(contents)?)
}
