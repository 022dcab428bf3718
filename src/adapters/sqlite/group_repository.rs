//! SQLite implementations of the GroupRepository and UserRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{format_datetime, is_unique_violation, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{StudyGroup, UserProfile};
use crate::domain::ports::{GroupRepository, UserRepository};

const GROUP_COLUMNS: &str =
    "id, name, description, creator_id, max_members, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteGroupRepository {
    pool: SqlitePool,
}

impl SqliteGroupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_members(&self, group_id: &str) -> DomainResult<Vec<Uuid>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT user_id FROM group_members WHERE group_id = ? ORDER BY joined_at, rowid",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(id,)| parse_uuid(id)).collect()
    }

    async fn hydrate(&self, row: GroupRow) -> DomainResult<StudyGroup> {
        let members = self.load_members(&row.id).await?;
        row.into_group(members)
    }
}

#[async_trait]
impl GroupRepository for SqliteGroupRepository {
    async fn create(&self, group: &StudyGroup) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        let id = group.id.to_string();

        sqlx::query(
            r#"INSERT INTO study_groups (id, name, description, creator_id, max_members, is_active, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.creator.to_string())
        .bind(i64::from(group.max_members))
        .bind(group.is_active)
        .bind(format_datetime(group.created_at))
        .bind(format_datetime(group.updated_at))
        .execute(&mut *tx)
        .await?;

        for member in &group.members {
            sqlx::query("INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(member.to_string())
                .bind(format_datetime(group.created_at))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<StudyGroup>> {
        let row: Option<GroupRow> =
            sqlx::query_as(&format!("SELECT {GROUP_COLUMNS} FROM study_groups WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> DomainResult<bool> {
        let id = group_id.to_string();
        let now = format_datetime(at);

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"INSERT INTO group_members (group_id, user_id, joined_at)
               SELECT ?, ?, ?
               WHERE (SELECT COUNT(*) FROM group_members WHERE group_id = ?)
                     < (SELECT max_members FROM study_groups WHERE id = ?)"#,
        )
        .bind(&id)
        .bind(user_id.to_string())
        .bind(&now)
        .bind(&id)
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::AlreadyMember(user_id)
            } else {
                DomainError::from(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE study_groups SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn find_active_by_creator(&self, creator: Uuid) -> DomainResult<Option<StudyGroup>> {
        let row: Option<GroupRow> = sqlx::query_as(&format!(
            "SELECT {GROUP_COLUMNS} FROM study_groups WHERE creator_id = ? AND is_active = 1 LIMIT 1"
        ))
        .bind(creator.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_member(&self, user_id: Uuid) -> DomainResult<Vec<StudyGroup>> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            r#"SELECT g.id, g.name, g.description, g.creator_id, g.max_members, g.is_active, g.created_at, g.updated_at
               FROM study_groups g
               JOIN group_members m ON m.group_id = g.id
               WHERE m.user_id = ? AND g.is_active = 1
               ORDER BY g.updated_at DESC"#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(self.hydrate(row).await?);
        }
        Ok(groups)
    }

    async fn deactivate(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        let result = sqlx::query("UPDATE study_groups SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(format_datetime(at))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::GroupNotFound(id));
        }
        Ok(())
    }

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> DomainResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM group_members WHERE group_id = ? AND user_id = ?")
                .bind(group_id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: String,
    name: String,
    description: String,
    creator_id: String,
    max_members: i64,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl GroupRow {
    fn into_group(self, members: Vec<Uuid>) -> DomainResult<StudyGroup> {
        Ok(StudyGroup {
            id: parse_uuid(&self.id)?,
            name: self.name,
            description: self.description,
            creator: parse_uuid(&self.creator_id)?,
            members,
            max_members: u32::try_from(self.max_members)
                .map_err(|e| DomainError::SerializationError(e.to_string()))?,
            is_active: self.is_active,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&row.id)?,
            name: row.name,
            email: row.email,
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn upsert(&self, user: &UserProfile) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO users (id, name, email) VALUES (?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email"#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<UserProfile>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, name, email FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserProfile>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, email FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> DomainResult<HashMap<Uuid, UserProfile>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id, name, email FROM users WHERE id IN ({placeholders})");
        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| UserProfile::try_from(row).map(|user| (user.id, user)))
            .collect()
    }
}
