//! Configuration module for Huddle.

use serde::Deserialize;
use std::path::Path;

use crate::{HuddleError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum number of concurrent chat connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Seconds a new connection has to send credentials and a room id.
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_connections() -> usize {
    256
}

fn default_auth_timeout() -> u64 {
    30
}

/// Upper bound for `server.auth_timeout_secs` (one day).
pub const MAX_AUTH_TIMEOUT_SECS: u64 = 86_400;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            auth_timeout_secs: default_auth_timeout(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/huddle.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/huddle.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Chat engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Frames buffered per recipient before it is considered too slow and evicted.
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Announce joins and leaves to the other members of a room.
    #[serde(default = "default_presence_notifications")]
    pub presence_notifications: bool,
    /// Only allow joining rooms that were created beforehand.
    #[serde(default)]
    pub require_registered_rooms: bool,
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_presence_notifications() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_outbound_queue_capacity(),
            presence_notifications: default_presence_notifications(),
            require_registered_rooms: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Chat engine configuration.
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(HuddleError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| HuddleError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `HUDDLE_DATABASE_PATH`: Override the database file path
    /// - `HUDDLE_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("HUDDLE_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(level) = std::env::var("HUDDLE_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_connections == 0 {
            return Err(HuddleError::Config(
                "server.max_connections must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_AUTH_TIMEOUT_SECS).contains(&self.server.auth_timeout_secs) {
            return Err(HuddleError::Config(format!(
                "server.auth_timeout_secs must be between 1 and {MAX_AUTH_TIMEOUT_SECS}"
            )));
        }
        if self.chat.outbound_queue_capacity == 0 {
            return Err(HuddleError::Config(
                "chat.outbound_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
