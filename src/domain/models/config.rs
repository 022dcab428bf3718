use serde::{Deserialize, Serialize};

/// Main configuration structure for StudySync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Maintenance sweep configuration
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".studysync/studysync.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// When false the core runs in disabled-cache mode and always recomputes
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached payloads
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,

    /// Floor TTL for progress and leaderboard entries, in seconds
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_cache_capacity() -> u64 {
    10_000
}

const fn default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_capacity: default_cache_capacity(),
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

/// Maintenance sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MaintenanceConfig {
    /// Run the sweep in the background while serving
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between sweeps. Must not exceed 60 or minute-level daily
    /// resets can be missed.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Delay before the first sweep after startup
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
}

const fn default_interval_secs() -> u64 {
    60
}

const fn default_initial_delay_secs() -> u64 {
    10
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
