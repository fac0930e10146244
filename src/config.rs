//! Configuration module for SkyVault.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, SkyvaultError};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/skyvault.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Chunk storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunksConfig {
    /// Directory holding the content-addressed chunk objects.
    #[serde(default = "default_chunk_path")]
    pub storage_path: String,
    /// Size of each chunk produced when splitting an upload.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,
    /// Reject puts whose hash is not the SHA-256 of the payload.
    #[serde(default = "default_verify_hashes")]
    pub verify_hashes: bool,
}

fn default_chunk_path() -> String {
    "data/chunks".to_string()
}

fn default_chunk_size() -> usize {
    4 * 1024 * 1024 // 4MB
}

fn default_verify_hashes() -> bool {
    true
}

impl Default for ChunksConfig {
    fn default() -> Self {
        Self {
            storage_path: default_chunk_path(),
            chunk_size_bytes: default_chunk_size(),
            verify_hashes: default_verify_hashes(),
        }
    }
}

/// Orphan sweeper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Whether the background sweeper runs at all.
    #[serde(default = "default_sweeper_enabled")]
    pub enabled: bool,
    /// Seconds between sweep passes.
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

fn default_sweeper_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    3600 // 1 hour
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweeper_enabled(),
            interval_secs: default_sweep_interval(),
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
    "logs/skyvault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Chunk storage configuration.
    #[serde(default)]
    pub chunks: ChunksConfig,
    /// Orphan sweeper configuration.
    #[serde(default)]
    pub sweeper: SweeperConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SkyvaultError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SkyvaultError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SKYVAULT_DB_PATH`: Override the database file path
    /// - `SKYVAULT_CHUNK_PATH`: Override the chunk storage directory
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SKYVAULT_DB_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(path) = std::env::var("SKYVAULT_CHUNK_PATH") {
            if !path.is_empty() {
                self.chunks.storage_path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chunks.chunk_size_bytes == 0 {
            return Err(SkyvaultError::Config(
                "chunks.chunk_size_bytes must be greater than zero".to_string(),
            ));
        }
        if self.sweeper.interval_secs == 0 {
            return Err(SkyvaultError::Config(
                "sweeper.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
