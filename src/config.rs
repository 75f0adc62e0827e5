//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the store can hold
    pub store_capacity: usize,
    /// Path to the write-ahead log file
    pub log_file: PathBuf,
    /// Background compaction check interval in seconds
    pub compaction_interval: u64,
    /// Number of WAL records that triggers compaction
    pub max_log_size: usize,
    /// Background TTL sweep interval in seconds
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORE_CAPACITY` - Maximum store entries (default: 100)
    /// - `LOG_FILE` - WAL file path (default: data/wal.log)
    /// - `COMPACTION_INTERVAL` - Compaction check frequency in seconds (default: 300)
    /// - `MAX_LOG_SIZE` - WAL record count that triggers compaction (default: 1000)
    /// - `CLEANUP_INTERVAL` - TTL sweep frequency in seconds (default: 60)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            store_capacity: env::var("STORE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            log_file: env::var("LOG_FILE")
                .ok()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/wal.log")),
            compaction_interval: env::var("COMPACTION_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            max_log_size: env::var("MAX_LOG_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_capacity: 100,
            log_file: PathBuf::from("data/wal.log"),
            compaction_interval: 300,
            max_log_size: 1000,
            cleanup_interval: 60,
            server_port: 3000,
        }
    }
}
