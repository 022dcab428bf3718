//! Cache coordinator for computed progress and leaderboard payloads.
//!
//! Wraps an optional [`CacheStore`]. With no store the coordinator runs in
//! disabled-cache mode and every read misses. Store failures are logged and
//! treated as misses; they never reach the caller.
//!
//! Every group carries an invalidation generation. Readers take a
//! [`CacheGeneration`] before reading the ledger and hand it back when they
//! store the computed payload; a payload computed before an invalidation is
//! never left in the store.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::models::leaderboard::{leaderboard_key_prefix, progress_cache_key};
use crate::domain::ports::CacheStore;

/// Minimum lifetime of a cached payload, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// A group's invalidation count at the moment a read began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeneration {
    group_id: Uuid,
    value: u64,
}

pub struct CacheCoordinator {
    store: Option<Arc<dyn CacheStore>>,
    floor_ttl: Duration,
    generations: Mutex<HashMap<Uuid, u64>>,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store: Some(store),
            floor_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Coordinator with no backing store. Reads always recompute.
    pub fn disabled() -> Self {
        Self {
            store: None,
            floor_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            generations: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_optional(store: Option<Arc<dyn CacheStore>>) -> Self {
        match store {
            Some(store) => Self::new(store),
            None => Self::disabled(),
        }
    }

    pub fn with_floor_ttl(mut self, floor_ttl: Duration) -> Self {
        self.floor_ttl = floor_ttl;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn generations(&self) -> MutexGuard<'_, HashMap<Uuid, u64>> {
        self.generations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current generation of the group. Take it before reading the ledger.
    pub fn generation(&self, group_id: Uuid) -> CacheGeneration {
        let value = self.generations().get(&group_id).copied().unwrap_or(0);
        CacheGeneration { group_id, value }
    }

    fn is_current(&self, generation: CacheGeneration) -> bool {
        self.generation(generation.group_id) == generation
    }

    /// TTL for payloads derived from a goal: the floor, or the time left
    /// until the goal's deadline when that is longer.
    pub fn ttl_for(&self, deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
        let floor = self.floor_ttl.as_secs();
        let secs = deadline.map_or(floor, |deadline| {
            let remaining = (deadline - now).num_seconds();
            floor.max(u64::try_from(remaining).unwrap_or(0))
        });
        Duration::from_secs(secs)
    }

    /// Fetch and decode a cached payload. Any failure is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.store.as_ref()?;

        let raw = match store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key, "Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, recomputing");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                if let Err(e) = store.delete(key).await {
                    tracing::warn!(key, error = %e, "Cache delete failed");
                }
                None
            }
        }
    }

    /// Encode and store a payload computed under `generation`.
    ///
    /// Skipped when the group was invalidated since `generation` was taken.
    /// An invalidation racing the write itself removes the entry again.
    /// Failures are logged and dropped.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration, generation: CacheGeneration) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if !self.is_current(generation) {
            tracing::debug!(key, group_id = %generation.group_id, "Dropping payload computed before invalidation");
            return;
        }

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to encode cache payload");
                return;
            }
        };

        if let Err(e) = store.set(key, payload, ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
            return;
        }

        // The invalidation bumps before it deletes, so either it sees this
        // entry or this check sees the bump
        if !self.is_current(generation) {
            if let Err(e) = store.delete(key).await {
                tracing::warn!(key, error = %e, "Cache delete failed");
            }
        }
    }

    /// Drop the group's progress entry and every leaderboard entry under the
    /// group's prefix.
    pub async fn invalidate(&self, group_id: Uuid) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        *self.generations().entry(group_id).or_insert(0) += 1;

        let progress_key = progress_cache_key(group_id);
        let leaderboard_prefix = leaderboard_key_prefix(group_id);
        let (progress, leaderboards) = futures::join!(
            store.delete(&progress_key),
            store.delete_prefix(&leaderboard_prefix)
        );

        if let Err(e) = progress {
            tracing::warn!(group_id = %group_id, error = %e, "Failed to invalidate progress cache");
        }
        match leaderboards {
            Ok(removed) => {
                tracing::debug!(group_id = %group_id, removed, "Invalidated leaderboard cache");
            }
            Err(e) => {
                tracing::warn!(group_id = %group_id, error = %e, "Failed to invalidate leaderboard cache");
            }
        }
    }
}
