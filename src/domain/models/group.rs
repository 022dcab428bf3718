//! Study group domain model.
//!
//! A study group is a small, bounded set of members collaborating on one
//! active goal at a time. Groups are soft-deleted, never destroyed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard upper bound on group size.
pub const MAX_GROUP_MEMBERS: u32 = 50;

/// Size used when the creator does not specify one.
pub const DEFAULT_GROUP_MEMBERS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroup {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Owning user; always present in `members`.
    pub creator: Uuid,
    pub members: Vec<Uuid>,
    pub max_members: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudyGroup {
    pub fn new(name: impl Into<String>, creator: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            creator,
            members: vec![creator],
            max_members: DEFAULT_GROUP_MEMBERS,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_max_members(mut self, max_members: u32) -> Self {
        self.max_members = max_members;
        self
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.creator == user_id
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_members as usize
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn validate(&self) -> Result<(), String> {
        let name_len = self.name.trim().chars().count();
        if !(3..=50).contains(&name_len) {
            return Err("Group name must be between 3 and 50 characters".to_string());
        }
        if self.description.chars().count() > 500 {
            return Err("Description cannot exceed 500 characters".to_string());
        }
        if self.max_members == 0 || self.max_members > MAX_GROUP_MEMBERS {
            return Err(format!(
                "max_members must be between 1 and {MAX_GROUP_MEMBERS}"
            ));
        }
        if !self.is_member(self.creator) {
            return Err("Group creator must be a member".to_string());
        }
        if self.members.len() > self.max_members as usize {
            return Err("Group has more members than max_members".to_string());
        }
        Ok(())
    }
}

/// Minimal user record used to label leaderboard entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
        }
    }
}
