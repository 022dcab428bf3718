//! Study group and user directory ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{StudyGroup, UserProfile};

/// Repository interface for study group persistence.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Create a group together with its initial member set.
    async fn create(&self, group: &StudyGroup) -> DomainResult<()>;

    /// Get a group (with members) by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<StudyGroup>>;

    /// Add a member, joined at `at`, unless the group is already at capacity.
    ///
    /// The capacity check and insert happen in one statement. Returns
    /// `false` when the group is full.
    async fn add_member(&self, group_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> DomainResult<bool>;

    /// Find the active group created by a user, if any.
    async fn find_active_by_creator(&self, creator: Uuid) -> DomainResult<Option<StudyGroup>>;

    /// Active groups the user belongs to, most recently updated first.
    async fn list_for_member(&self, user_id: Uuid) -> DomainResult<Vec<StudyGroup>>;

    /// Soft-delete a group as of `at`.
    async fn deactivate(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()>;

    /// Membership predicate used by every core operation.
    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> DomainResult<bool>;
}

/// Directory of known users, used for display names.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert or update a user profile.
    async fn upsert(&self, user: &UserProfile) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<UserProfile>>;

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserProfile>>;

    /// Bulk lookup; unknown IDs are absent from the map.
    async fn get_many(&self, ids: &[Uuid]) -> DomainResult<HashMap<Uuid, UserProfile>>;
}
