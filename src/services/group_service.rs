//! Study group service: creation, membership and soft deletion.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{StudyGroup, UserProfile, DEFAULT_GROUP_MEMBERS};
use crate::domain::ports::{Clock, GroupRepository, UserRepository};
use crate::services::cache_coordinator::CacheCoordinator;

pub struct GroupService {
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    cache: Arc<CacheCoordinator>,
    clock: Arc<dyn Clock>,
}

impl GroupService {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
        cache: Arc<CacheCoordinator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            groups,
            users,
            cache,
            clock,
        }
    }

    /// Create a group owned by `creator`. A user may own one active group.
    pub async fn create_group(
        &self,
        name: String,
        description: Option<String>,
        max_members: Option<u32>,
        creator: Uuid,
    ) -> DomainResult<StudyGroup> {
        if let Some(existing) = self.groups.find_active_by_creator(creator).await? {
            return Err(DomainError::AlreadyCreator {
                user_id: creator,
                group_id: existing.id,
            });
        }

        let group = StudyGroup::new(name.trim(), creator, self.clock.now())
            .with_description(description.unwrap_or_default())
            .with_max_members(max_members.unwrap_or(DEFAULT_GROUP_MEMBERS));
        group.validate().map_err(DomainError::ValidationFailed)?;

        self.groups.create(&group).await?;
        tracing::info!(group_id = %group.id, creator = %creator, "Created study group");
        Ok(group)
    }

    /// Add `user_id` to the group. Only the creator may add members.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        requester: Uuid,
        user_id: Uuid,
    ) -> DomainResult<StudyGroup> {
        let group = self.get_active_group(group_id).await?;
        if !group.is_creator(requester) {
            return Err(DomainError::NotGroupCreator);
        }
        if group.is_member(user_id) {
            return Err(DomainError::AlreadyMember(user_id));
        }
        if group.is_full() {
            return Err(DomainError::GroupFull(group_id));
        }

        if !self.groups.add_member(group_id, user_id, self.clock.now()).await? {
            return Err(DomainError::GroupFull(group_id));
        }
        tracing::info!(group_id = %group_id, user_id = %user_id, "Added group member");

        self.get_active_group(group_id).await
    }

    /// Add a member by email address.
    pub async fn add_member_by_email(
        &self,
        group_id: Uuid,
        requester: Uuid,
        email: &str,
    ) -> DomainResult<StudyGroup> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(email.to_string()))?;
        self.add_member(group_id, requester, user.id).await
    }

    /// Soft-delete the group. Only the creator may deactivate it.
    pub async fn deactivate_group(&self, group_id: Uuid, requester: Uuid) -> DomainResult<()> {
        let group = self.get_active_group(group_id).await?;
        if !group.is_creator(requester) {
            return Err(DomainError::NotGroupCreator);
        }

        self.groups.deactivate(group_id, self.clock.now()).await?;
        self.cache.invalidate(group_id).await;
        tracing::info!(group_id = %group_id, "Deactivated study group");
        Ok(())
    }

    pub async fn list_user_groups(&self, user_id: Uuid) -> DomainResult<Vec<StudyGroup>> {
        self.groups.list_for_member(user_id).await
    }

    pub async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> DomainResult<bool> {
        self.groups.is_member(group_id, user_id).await
    }

    /// Register or update a user in the directory.
    pub async fn register_user(&self, name: &str, email: &str) -> DomainResult<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::ValidationFailed("User name cannot be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(DomainError::ValidationFailed(format!("Invalid email address: {email}")));
        }

        let user = match self.users.find_by_email(email).await? {
            Some(existing) => UserProfile {
                name: name.to_string(),
                ..existing
            },
            None => UserProfile::new(name, email),
        };
        self.users.upsert(&user).await?;
        Ok(user)
    }

    async fn get_active_group(&self, group_id: Uuid) -> DomainResult<StudyGroup> {
        self.groups
            .get(group_id)
            .await?
            .filter(|g| g.is_active)
            .ok_or(DomainError::GroupNotFound(group_id))
    }
}
