use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{CacheConfig, Config, DatabaseConfig, LoggingConfig, MaintenanceConfig};

const ENV_PREFIX: &str = "STUDYSYNC_";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid cache max_capacity: {0}. Must be at least 1")]
    InvalidCacheCapacity(u64),

    #[error("Invalid cache default_ttl_secs: {0}. Must be at least 1")]
    InvalidCacheTtl(u64),

    #[error("Invalid maintenance interval_secs: {0}. Must be between 1 and 60 so minute-level resets are observed")]
    InvalidMaintenanceInterval(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Loads [`Config`] from layered sources.
///
/// Later layers win:
/// 1. built-in defaults
/// 2. `.studysync/config.yaml`, written by `studysync init`
/// 3. `.studysync/local.yaml`, for uncommitted overrides
/// 4. `STUDYSYNC_*` environment variables, with `__` between sections
///    (`STUDYSYNC_CACHE__ENABLED=false`)
///
/// Missing files are skipped.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the project in the current directory.
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Load configuration for the project rooted at `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let state_dir = root.as_ref().join(".studysync");
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(state_dir.join("config.yaml")))
            .merge(Yaml::file(state_dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::extract(&figment).with_context(|| format!("Failed to load configuration under {}", state_dir.display()))
    }

    fn extract(figment: &Figment) -> Result<Config> {
        let config: Config = figment.extract()?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        validate_database(&config.database)?;
        validate_cache(&config.cache)?;
        validate_maintenance(&config.maintenance)?;
        validate_logging(&config.logging)
    }
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    if database.path.trim().is_empty() {
        return Err(ConfigError::EmptyDatabasePath);
    }
    if database.max_connections == 0 {
        return Err(ConfigError::InvalidMaxConnections(0));
    }
    Ok(())
}

fn validate_cache(cache: &CacheConfig) -> Result<(), ConfigError> {
    // A disabled cache is never built, so its limits do not matter
    if !cache.enabled {
        return Ok(());
    }
    if cache.max_capacity == 0 {
        return Err(ConfigError::InvalidCacheCapacity(0));
    }
    if cache.default_ttl_secs == 0 {
        return Err(ConfigError::InvalidCacheTtl(0));
    }
    Ok(())
}

fn validate_maintenance(maintenance: &MaintenanceConfig) -> Result<(), ConfigError> {
    if (1..=60).contains(&maintenance.interval_secs) {
        Ok(())
    } else {
        Err(ConfigError::InvalidMaintenanceInterval(maintenance.interval_secs))
    }
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    if !LOG_LEVELS.contains(&logging.level.as_str()) {
        return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
    }
    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        return Err(ConfigError::InvalidLogFormat(logging.format.clone()));
    }
    if logging.log_dir.as_deref().is_some_and(|dir| dir.trim().is_empty()) {
        return Err(ConfigError::ValidationFailed("logging.log_dir cannot be blank".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(config_yaml: &str, local_yaml: Option<&str>) -> TempDir {
        let root = tempfile::tempdir().unwrap();
        let state_dir = root.path().join(".studysync");
        fs::create_dir_all(&state_dir).unwrap();
        fs::write(state_dir.join("config.yaml"), config_yaml).unwrap();
        if let Some(local) = local_yaml {
            fs::write(state_dir.join("local.yaml"), local).unwrap();
        }
        root
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.database.path, ".studysync/studysync.db");
        assert_eq!(config.cache.default_ttl_secs, 300);
        assert_eq!(config.maintenance.interval_secs, 60);
        ConfigLoader::validate(&config).unwrap();
    }

    #[test]
    fn test_missing_project_falls_back_to_defaults() {
        let root = tempfile::tempdir().unwrap();
        temp_env::with_vars_unset(["STUDYSYNC_LOGGING__LEVEL", "STUDYSYNC_CACHE__ENABLED"], || {
            let config = ConfigLoader::load_from_dir(root.path()).unwrap();
            assert_eq!(config.logging.level, "info");
            assert!(config.cache.enabled);
        });
    }

    #[test]
    fn test_local_file_overrides_project_file() {
        let root = project(
            "maintenance:\n  interval_secs: 45\nlogging:\n  level: info\n  format: json\n",
            Some("maintenance:\n  interval_secs: 15\n"),
        );

        let config = ConfigLoader::load_from_dir(root.path()).unwrap();
        assert_eq!(config.maintenance.interval_secs, 15);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_environment_overrides_files() {
        let root = project("logging:\n  level: info\ncache:\n  default_ttl_secs: 60\n", None);

        temp_env::with_vars(
            [
                ("STUDYSYNC_LOGGING__LEVEL", Some("debug")),
                ("STUDYSYNC_CACHE__ENABLED", Some("false")),
            ],
            || {
                let config = ConfigLoader::load_from_dir(root.path()).unwrap();
                assert_eq!(config.logging.level, "debug");
                assert!(!config.cache.enabled);
                assert_eq!(config.cache.default_ttl_secs, 60);
            },
        );
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let root = project("maintenance:\n  interval_secs: 300\n", None);
        let err = ConfigLoader::load_from_dir(root.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidMaintenanceInterval(300))
        ));
    }

    fn assert_rejected(mutate: impl FnOnce(&mut Config), expected: impl Fn(&ConfigError) -> bool) {
        let mut config = Config::default();
        mutate(&mut config);
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(expected(&err), "unexpected error: {err}");
    }

    #[test]
    fn test_validation_rejections() {
        assert_rejected(|c| c.database.path = "  ".into(), |e| matches!(e, ConfigError::EmptyDatabasePath));
        assert_rejected(|c| c.database.max_connections = 0, |e| {
            matches!(e, ConfigError::InvalidMaxConnections(0))
        });
        assert_rejected(|c| c.cache.max_capacity = 0, |e| matches!(e, ConfigError::InvalidCacheCapacity(0)));
        assert_rejected(|c| c.cache.default_ttl_secs = 0, |e| matches!(e, ConfigError::InvalidCacheTtl(0)));
        assert_rejected(|c| c.maintenance.interval_secs = 0, |e| {
            matches!(e, ConfigError::InvalidMaintenanceInterval(0))
        });
        assert_rejected(|c| c.logging.level = "loud".into(), |e| matches!(e, ConfigError::InvalidLogLevel(_)));
        assert_rejected(|c| c.logging.format = "xml".into(), |e| matches!(e, ConfigError::InvalidLogFormat(_)));
        assert_rejected(|c| c.logging.log_dir = Some(String::new()), |e| {
            matches!(e, ConfigError::ValidationFailed(_))
        });
    }

    #[test]
    fn test_disabled_cache_skips_limit_checks() {
        let mut config = Config::default();
        config.cache.enabled = false;
        config.cache.default_ttl_secs = 0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }
}
