//! Activity ledger port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{GroupMemberActivity, UserContribution};

/// Filter for aggregating countable activity of one goal.
#[derive(Debug, Clone)]
pub struct ActivityWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub subjects: Option<Vec<Uuid>>,
}

/// Append-only store of member activity.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Insert an event. Enforces uniqueness of (user, goal, question) at the
    /// storage layer and fails with `DuplicateActivity` on conflict.
    async fn insert(&self, activity: &GroupMemberActivity) -> DomainResult<()>;

    /// Whether an event already exists for (user, goal, question).
    async fn exists(&self, user_id: Uuid, goal_id: Uuid, question_id: Uuid) -> DomainResult<bool>;

    /// Count countable events of a goal created at or after `since`.
    async fn count_countable(&self, goal_id: Uuid, since: DateTime<Utc>) -> DomainResult<u64>;

    /// Per-user aggregate of countable events in the window, ordered by each
    /// user's first contribution in the window.
    async fn aggregate_by_user(
        &self,
        goal_id: Uuid,
        window: &ActivityWindow,
    ) -> DomainResult<Vec<UserContribution>>;

    /// A user's countable events for a goal, newest first.
    async fn list_countable_for_user(
        &self,
        goal_id: Uuid,
        user_id: Uuid,
    ) -> DomainResult<Vec<GroupMemberActivity>>;
}
