//! SQLite implementation of the GoalRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_datetime, is_unique_violation, parse_datetime, parse_optional_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    GoalSchedule, GroupGoal, ProgressSnapshot, RecurringPattern, TargetMetric, TargetMetricKind,
};
use crate::domain::ports::GoalRepository;

const GOAL_COLUMNS: &str = "id, group_id, title, description, subjects, target_type, target_value, \
     deadline, recurring_pattern, is_active, archived_at, last_reset_at, progress_total, \
     progress_completed, progress_percentage, progress_last_updated, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteGoalRepository {
    pool: SqlitePool,
}

impl SqliteGoalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, sql: &str, binds: &[String]) -> DomainResult<Vec<GroupGoal>> {
        let mut query = sqlx::query_as::<_, GoalRow>(sql);
        for value in binds {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(GroupGoal::try_from).collect()
    }
}

#[async_trait]
impl GoalRepository for SqliteGoalRepository {
    async fn create_active(&self, goal: &GroupGoal) -> DomainResult<u64> {
        let subjects_json = serde_json::to_string(&goal.subjects)?;
        let pattern_json = goal
            .recurring_pattern()
            .map(serde_json::to_string)
            .transpose()?;
        let now = format_datetime(goal.created_at);

        let mut tx = self.pool.begin().await?;

        let superseded = sqlx::query(
            "UPDATE group_goals SET is_active = 0, updated_at = ? WHERE group_id = ? AND is_active = 1",
        )
        .bind(&now)
        .bind(goal.group_id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"INSERT INTO group_goals (id, group_id, title, description, subjects, target_type, target_value,
               deadline, recurring_pattern, is_active, archived_at, last_reset_at, progress_total,
               progress_completed, progress_percentage, progress_last_updated, created_by, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(goal.id.to_string())
        .bind(goal.group_id.to_string())
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(&subjects_json)
        .bind(goal.target.kind.as_str())
        .bind(goal.target.value)
        .bind(goal.deadline().map(format_datetime))
        .bind(&pattern_json)
        .bind(goal.is_active)
        .bind(goal.archived_at.map(format_datetime))
        .bind(goal.last_reset_at.map(format_datetime))
        .bind(goal.progress.total)
        .bind(i64::try_from(goal.progress.completed).unwrap_or(i64::MAX))
        .bind(goal.progress.percentage)
        .bind(format_datetime(goal.progress.last_updated))
        .bind(goal.created_by.to_string())
        .bind(&now)
        .bind(format_datetime(goal.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::ActiveGoalConflict(goal.group_id)
            } else {
                DomainError::from(e)
            }
        })?;

        tx.commit().await?;
        Ok(superseded)
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<GroupGoal>> {
        let row: Option<GoalRow> =
            sqlx::query_as(&format!("SELECT {GOAL_COLUMNS} FROM group_goals WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn get_active(&self, group_id: Uuid) -> DomainResult<Option<GroupGoal>> {
        let row: Option<GoalRow> = sqlx::query_as(&format!(
            "SELECT {GOAL_COLUMNS} FROM group_goals WHERE group_id = ? AND is_active = 1"
        ))
        .bind(group_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list_by_group(&self, group_id: Uuid) -> DomainResult<Vec<GroupGoal>> {
        self.fetch_many(
            &format!(
                "SELECT {GOAL_COLUMNS} FROM group_goals WHERE group_id = ? ORDER BY created_at DESC"
            ),
            &[group_id.to_string()],
        )
        .await
    }

    async fn find_expired_active(&self, now: DateTime<Utc>) -> DomainResult<Vec<GroupGoal>> {
        self.fetch_many(
            &format!(
                "SELECT {GOAL_COLUMNS} FROM group_goals \
                 WHERE is_active = 1 AND deadline IS NOT NULL AND deadline < ? \
                 ORDER BY deadline"
            ),
            &[format_datetime(now)],
        )
        .await
    }

    async fn archive(&self, ids: &[Uuid], now: DateTime<Utc>) -> DomainResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE group_goals SET is_active = 0, archived_at = ?, updated_at = ? \
             WHERE is_active = 1 AND id IN ({placeholders})"
        );
        let stamp = format_datetime(now);
        let mut query = sqlx::query(&sql).bind(&stamp).bind(&stamp);
        for id in ids {
            query = query.bind(id.to_string());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn list_active_recurring(&self) -> DomainResult<Vec<GroupGoal>> {
        self.fetch_many(
            &format!(
                "SELECT {GOAL_COLUMNS} FROM group_goals \
                 WHERE is_active = 1 AND recurring_pattern IS NOT NULL ORDER BY created_at"
            ),
            &[],
        )
        .await
    }

    async fn reset_progress(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        window_start: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let stamp = format_datetime(now);
        let result = sqlx::query(
            r#"UPDATE group_goals
               SET progress_completed = 0, progress_percentage = 0, progress_last_updated = ?,
                   last_reset_at = ?, updated_at = ?
               WHERE id = ? AND is_active = 1 AND recurring_pattern IS NOT NULL
                 AND (last_reset_at IS NULL OR last_reset_at < ?)"#,
        )
        .bind(&stamp)
        .bind(&stamp)
        .bind(&stamp)
        .bind(id.to_string())
        .bind(format_datetime(window_start))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: &ProgressSnapshot,
        counted_since: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = sqlx::query(
            r#"UPDATE group_goals
               SET progress_total = ?, progress_completed = ?, progress_percentage = ?,
                   progress_last_updated = ?, updated_at = ?
               WHERE id = ? AND (last_reset_at IS NULL OR last_reset_at <= ?)"#,
        )
        .bind(progress.total)
        .bind(i64::try_from(progress.completed).unwrap_or(i64::MAX))
        .bind(progress.percentage)
        .bind(format_datetime(progress.last_updated))
        .bind(format_datetime(progress.last_updated))
        .bind(id.to_string())
        .bind(format_datetime(counted_since))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Distinguish a missing goal from a skipped stale write
        if self.get(id).await?.is_none() {
            return Err(DomainError::GoalNotFound(id));
        }
        Ok(false)
    }
}

#[derive(sqlx::FromRow)]
struct GoalRow {
    id: String,
    group_id: String,
    title: String,
    description: String,
    subjects: String,
    target_type: String,
    target_value: i64,
    deadline: Option<String>,
    recurring_pattern: Option<String>,
    is_active: bool,
    archived_at: Option<String>,
    last_reset_at: Option<String>,
    progress_total: i64,
    progress_completed: i64,
    progress_percentage: f64,
    progress_last_updated: String,
    created_by: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<GoalRow> for GroupGoal {
    type Error = DomainError;

    fn try_from(row: GoalRow) -> Result<Self, Self::Error> {
        let subjects: Vec<String> = serde_json::from_str(&row.subjects)?;
        let subjects = subjects
            .iter()
            .map(|s| parse_uuid(s))
            .collect::<DomainResult<Vec<_>>>()?;

        let kind = TargetMetricKind::from_str(&row.target_type).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid target type: {}", row.target_type))
        })?;

        let deadline = parse_optional_datetime(row.deadline)?;
        let pattern: Option<RecurringPattern> = row
            .recurring_pattern
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let schedule = GoalSchedule::from_parts(deadline, pattern).ok_or_else(|| {
            DomainError::SerializationError(format!(
                "Goal {} must carry exactly one of deadline or recurring pattern",
                row.id
            ))
        })?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            group_id: parse_uuid(&row.group_id)?,
            title: row.title,
            description: row.description,
            subjects,
            target: TargetMetric {
                kind,
                value: row.target_value,
            },
            schedule,
            is_active: row.is_active,
            archived_at: parse_optional_datetime(row.archived_at)?,
            last_reset_at: parse_optional_datetime(row.last_reset_at)?,
            progress: ProgressSnapshot {
                total: row.progress_total,
                completed: u64::try_from(row.progress_completed).unwrap_or(0),
                percentage: row.progress_percentage,
                last_updated: parse_datetime(&row.progress_last_updated)?,
            },
            created_by: parse_uuid(&row.created_by)?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
