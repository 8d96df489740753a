//! Configuration management
//!
//! This module handles loading and parsing configuration for the Timekeeper service.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults. The token
//! signing secret has no default and must be supplied by one of the two.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::services::token::MIN_SECRET_BYTES;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Ledger storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// External time authority configuration
    #[serde(default)]
    pub time_api: TimeApiConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (`*` allows any)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "*".to_string()
}

/// Ledger storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage driver (memory or sqlite)
    #[serde(default)]
    pub driver: StorageDriver,
    /// SQLite database path or URL
    #[serde(default = "default_storage_url")]
    pub url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::default(),
            url: default_storage_url(),
        }
    }
}

fn default_storage_url() -> String {
    "data/timekeeper.db".to_string()
}

/// Storage driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    /// Process-local maps, lost on restart
    Memory,
    /// SQLite file (default)
    #[default]
    Sqlite,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign identity tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// The one username that is granted admin privileges
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    /// Path to the credential file (JSON array of username/password_hash)
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// Token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            admin_username: default_admin_username(),
            credentials_path: default_credentials_path(),
            token_ttl_seconds: default_token_ttl(),
        }
    }
}

fn default_admin_username() -> String {
    "admin@mail.com".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("users.json")
}

fn default_token_ttl() -> u64 {
    3600
}

/// External time authority configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeApiConfig {
    /// Endpoint returning a JSON body with a `datetime` field
    #[serde(default = "default_time_api_url")]
    pub url: String,
    /// Total number of attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Constant delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Timeout for a single upstream request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TimeApiConfig {
    fn default() -> Self {
        Self {
            url: default_time_api_url(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_time_api_url() -> String {
    "https://worldtimeapi.org/api/timezone/Europe/Berlin".to_string()
}

fn default_max_attempts() -> u32 {
    500
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `TIMEKEEPER_<SECTION>_<KEY>`,
    /// e.g. `TIMEKEEPER_SERVER_PORT` or `TIMEKEEPER_AUTH_JWT_SECRET`.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Check the values the service cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth.jwt_secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => {
                if secret.len() < MIN_SECRET_BYTES {
                    return Err(ConfigError::ValidationError(format!(
                        "auth.jwt_secret must be at least {} bytes",
                        MIN_SECRET_BYTES
                    )));
                }
            }
            _ => {
                return Err(ConfigError::ValidationError(
                    "auth.jwt_secret must be set (or TIMEKEEPER_AUTH_JWT_SECRET)".to_string(),
                ))
            }
        }
        if self.auth.token_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.time_api.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "time_api.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("TIMEKEEPER_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("TIMEKEEPER_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("TIMEKEEPER_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Storage configuration
        if let Ok(driver) = std::env::var("TIMEKEEPER_STORAGE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.storage.driver = StorageDriver::Memory,
                "sqlite" => self.storage.driver = StorageDriver::Sqlite,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("TIMEKEEPER_STORAGE_URL") {
            self.storage.url = url;
        }

        // Auth configuration
        if let Ok(secret) = std::env::var("TIMEKEEPER_AUTH_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Ok(admin) = std::env::var("TIMEKEEPER_AUTH_ADMIN_USERNAME") {
            self.auth.admin_username = admin;
        }
        if let Ok(path) = std::env::var("TIMEKEEPER_AUTH_CREDENTIALS_PATH") {
            self.auth.credentials_path = PathBuf::from(path);
        }
        if let Ok(ttl) = std::env::var("TIMEKEEPER_AUTH_TOKEN_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.auth.token_ttl_seconds = ttl;
            }
        }

        // Time API configuration
        if let Ok(url) = std::env::var("TIMEKEEPER_TIME_API_URL") {
            self.time_api.url = url;
        }
        if let Ok(attempts) = std::env::var("TIMEKEEPER_TIME_API_MAX_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse::<u32>() {
                self.time_api.max_attempts = attempts;
            }
        }
        if let Ok(delay) = std::env::var("TIMEKEEPER_TIME_API_RETRY_DELAY_MS") {
            if let Ok(delay) = delay.parse::<u64>() {
                self.time_api.retry_delay_ms = delay;
            }
        }
        if let Ok(timeout) = std::env::var("TIMEKEEPER_TIME_API_REQUEST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.time_api.request_timeout_secs = timeout;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
