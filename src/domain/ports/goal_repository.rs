//! Goal repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{GroupGoal, ProgressSnapshot};

/// Repository interface for goal persistence.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    /// Deactivate any active goal of the group and insert `goal` as the new
    /// active goal, atomically. Returns the number of goals superseded.
    async fn create_active(&self, goal: &GroupGoal) -> DomainResult<u64>;

    /// Get a goal by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<GroupGoal>>;

    /// The group's single active goal, if any.
    async fn get_active(&self, group_id: Uuid) -> DomainResult<Option<GroupGoal>>;

    /// All goals of a group, newest first.
    async fn list_by_group(&self, group_id: Uuid) -> DomainResult<Vec<GroupGoal>>;

    /// Active goals whose deadline is strictly before `now`.
    async fn find_expired_active(&self, now: DateTime<Utc>) -> DomainResult<Vec<GroupGoal>>;

    /// Archive the given goals in one batch. Goals already inactive are left
    /// untouched. Returns the number archived.
    async fn archive(&self, ids: &[Uuid], now: DateTime<Utc>) -> DomainResult<u64>;

    /// Active goals carrying a recurring pattern.
    async fn list_active_recurring(&self) -> DomainResult<Vec<GroupGoal>>;

    /// Zero the progress counters and stamp `last_reset_at = now`, unless the
    /// goal was already reset at or after `window_start`. Returns whether a
    /// reset was applied.
    async fn reset_progress(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        window_start: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// Overwrite the progress snapshot computed from activity at or after
    /// `counted_since`. Skipped (returns `false`) when the goal was reset
    /// after that point, so a stale recompute never overwrites a reset.
    async fn update_progress(
        &self,
        id: Uuid,
        progress: &ProgressSnapshot,
        counted_since: DateTime<Utc>,
    ) -> DomainResult<bool>;
}
