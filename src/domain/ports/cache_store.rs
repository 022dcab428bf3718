//! Key-value cache port.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Cache-layer failures. Never surfaced past the cache coordinator.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache payload error: {0}")]
    Payload(String),
}

/// Key-value store with per-entry expiry and prefix deletion.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key starting with `prefix`. Returns the number removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}
