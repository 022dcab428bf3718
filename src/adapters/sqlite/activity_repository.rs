//! SQLite implementation of the ActivityRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_datetime, is_unique_violation, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ActivityStatus, GroupMemberActivity, UserContribution};
use crate::domain::ports::{ActivityRepository, ActivityWindow};

const COUNTABLE_FILTER: &str = "status IN ('solved', 'correct')";

#[derive(Clone)]
pub struct SqliteActivityRepository {
    pool: SqlitePool,
}

impl SqliteActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for SqliteActivityRepository {
    async fn insert(&self, activity: &GroupMemberActivity) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO group_member_activities (id, user_id, group_id, goal_id, question_id, subject_id, status, time_spent, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(activity.id.to_string())
        .bind(activity.user_id.to_string())
        .bind(activity.group_id.to_string())
        .bind(activity.goal_id.to_string())
        .bind(activity.question_id.to_string())
        .bind(activity.subject_id.to_string())
        .bind(activity.status.as_str())
        .bind(activity.time_spent)
        .bind(format_datetime(activity.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::DuplicateActivity {
                    user_id: activity.user_id,
                    goal_id: activity.goal_id,
                    question_id: activity.question_id,
                }
            } else {
                DomainError::from(e)
            }
        })?;

        Ok(())
    }

    async fn exists(&self, user_id: Uuid, goal_id: Uuid, question_id: Uuid) -> DomainResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM group_member_activities WHERE user_id = ? AND goal_id = ? AND question_id = ?",
        )
        .bind(user_id.to_string())
        .bind(goal_id.to_string())
        .bind(question_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn count_countable(&self, goal_id: Uuid, since: DateTime<Utc>) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM group_member_activities \
             WHERE goal_id = ? AND {COUNTABLE_FILTER} AND created_at >= ?"
        ))
        .bind(goal_id.to_string())
        .bind(format_datetime(since))
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn aggregate_by_user(
        &self,
        goal_id: Uuid,
        window: &ActivityWindow,
    ) -> DomainResult<Vec<UserContribution>> {
        let subjects = window.subjects.as_deref().filter(|s| !s.is_empty());
        let subject_clause = subjects.map_or_else(String::new, |s| {
            format!(" AND subject_id IN ({})", vec!["?"; s.len()].join(", "))
        });

        let sql = format!(
            "SELECT user_id, COUNT(*) AS questions_solved, COALESCE(SUM(time_spent), 0) AS total_time_spent, \
                    MAX(created_at) AS last_activity \
             FROM group_member_activities \
             WHERE goal_id = ? AND {COUNTABLE_FILTER} AND created_at >= ? AND created_at <= ?{subject_clause} \
             GROUP BY user_id \
             ORDER BY MIN(created_at), user_id"
        );

        let mut query = sqlx::query_as::<_, ContributionRow>(&sql)
            .bind(goal_id.to_string())
            .bind(format_datetime(window.start))
            .bind(format_datetime(window.end));
        for subject in subjects.unwrap_or_default() {
            query = query.bind(subject.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(UserContribution::try_from).collect()
    }

    async fn list_countable_for_user(
        &self,
        goal_id: Uuid,
        user_id: Uuid,
    ) -> DomainResult<Vec<GroupMemberActivity>> {
        let rows: Vec<ActivityRow> = sqlx::query_as(&format!(
            "SELECT id, user_id, group_id, goal_id, question_id, subject_id, status, time_spent, created_at \
             FROM group_member_activities \
             WHERE goal_id = ? AND user_id = ? AND {COUNTABLE_FILTER} \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(goal_id.to_string())
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GroupMemberActivity::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    user_id: String,
    group_id: String,
    goal_id: String,
    question_id: String,
    subject_id: String,
    status: String,
    time_spent: i64,
    created_at: String,
}

impl TryFrom<ActivityRow> for GroupMemberActivity {
    type Error = DomainError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let status = ActivityStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid activity status: {}", row.status))
        })?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            group_id: parse_uuid(&row.group_id)?,
            goal_id: parse_uuid(&row.goal_id)?,
            question_id: parse_uuid(&row.question_id)?,
            subject_id: parse_uuid(&row.subject_id)?,
            status,
            time_spent: row.time_spent,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ContributionRow {
    user_id: String,
    questions_solved: i64,
    total_time_spent: i64,
    last_activity: String,
}

impl TryFrom<ContributionRow> for UserContribution {
    type Error = DomainError;

    fn try_from(row: ContributionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: parse_uuid(&row.user_id)?,
            questions_solved: u64::try_from(row.questions_solved).unwrap_or(0),
            total_time_spent: row.total_time_spent,
            last_activity: parse_datetime(&row.last_activity)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteGoalRepository, SqliteGroupRepository};
    use crate::domain::models::{GoalSchedule, GroupGoal, NewActivity, NewGoal, StudyGroup, TargetMetric};
    use crate::domain::ports::{GoalRepository, GroupRepository};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        repo: SqliteActivityRepository,
        goal: GroupGoal,
        subject: Uuid,
        start: DateTime<Utc>,
    }

    async fn setup() -> Fixture {
        let pool = create_migrated_test_pool().await.unwrap();
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let group = StudyGroup::new("Biology", Uuid::new_v4(), start);
        SqliteGroupRepository::new(pool.clone()).create(&group).await.unwrap();

        let subject = Uuid::new_v4();
        let schedule = GoalSchedule::Deadline { deadline: start + Duration::days(30) };
        let goal = GroupGoal::new(
            NewGoal {
                group_id: group.id,
                title: "Cells".to_string(),
                description: String::new(),
                subjects: vec![subject],
                target: TargetMetric::count(10),
                deadline: schedule.deadline(),
                recurring_pattern: None,
            },
            schedule,
            group.creator,
            start,
        );
        SqliteGoalRepository::new(pool.clone()).create_active(&goal).await.unwrap();

        Fixture {
            repo: SqliteActivityRepository::new(pool),
            goal,
            subject,
            start,
        }
    }

    fn activity(
        f: &Fixture,
        user_id: Uuid,
        subject_id: Uuid,
        status: ActivityStatus,
        at: DateTime<Utc>,
    ) -> GroupMemberActivity {
        GroupMemberActivity::new(
            NewActivity {
                group_id: f.goal.group_id,
                user_id,
                question_id: Uuid::new_v4(),
                subject_id,
                status,
                time_spent: 60,
            },
            f.goal.id,
            at,
        )
    }

    #[tokio::test]
    async fn test_duplicate_activity_rejected_by_storage() {
        let f = setup().await;
        let event = activity(&f, Uuid::new_v4(), f.subject, ActivityStatus::Solved, f.start);
        f.repo.insert(&event).await.unwrap();

        let mut again = event.clone();
        again.id = Uuid::new_v4();
        let err = f.repo.insert(&again).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateActivity { .. }));
        assert!(f.repo.exists(event.user_id, event.goal_id, event.question_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_countable_since() {
        let f = setup().await;
        let user = Uuid::new_v4();
        f.repo.insert(&activity(&f, user, f.subject, ActivityStatus::Solved, f.start)).await.unwrap();
        f.repo
            .insert(&activity(&f, user, f.subject, ActivityStatus::Correct, f.start + Duration::hours(2)))
            .await
            .unwrap();
        f.repo
            .insert(&activity(&f, user, f.subject, ActivityStatus::Attempted, f.start + Duration::hours(3)))
            .await
            .unwrap();

        assert_eq!(f.repo.count_countable(f.goal.id, f.start).await.unwrap(), 2);
        assert_eq!(
            f.repo.count_countable(f.goal.id, f.start + Duration::hours(1)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_aggregate_orders_by_first_contribution() {
        let f = setup().await;
        let early = Uuid::new_v4();
        let late = Uuid::new_v4();
        let other_subject = Uuid::new_v4();

        f.repo
            .insert(&activity(&f, late, f.subject, ActivityStatus::Solved, f.start + Duration::minutes(10)))
            .await
            .unwrap();
        f.repo.insert(&activity(&f, early, f.subject, ActivityStatus::Solved, f.start)).await.unwrap();
        f.repo
            .insert(&activity(&f, early, other_subject, ActivityStatus::Correct, f.start + Duration::minutes(20)))
            .await
            .unwrap();

        let window = ActivityWindow {
            start: f.start,
            end: f.start + Duration::hours(1),
            subjects: None,
        };
        let all = f.repo.aggregate_by_user(f.goal.id, &window).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, early);
        assert_eq!(all[0].questions_solved, 2);
        assert_eq!(all[0].total_time_spent, 120);
        assert_eq!(all[0].last_activity, f.start + Duration::minutes(20));
        assert_eq!(all[1].user_id, late);

        let filtered = f
            .repo
            .aggregate_by_user(
                f.goal.id,
                &ActivityWindow {
                    subjects: Some(vec![other_subject]),
                    ..window
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].questions_solved, 1);
    }

    #[tokio::test]
    async fn test_list_countable_for_user_newest_first() {
        let f = setup().await;
        let user = Uuid::new_v4();
        f.repo.insert(&activity(&f, user, f.subject, ActivityStatus::Solved, f.start)).await.unwrap();
        f.repo
            .insert(&activity(&f, user, f.subject, ActivityStatus::Solved, f.start + Duration::hours(1)))
            .await
            .unwrap();
        f.repo
            .insert(&activity(&f, user, f.subject, ActivityStatus::Attempted, f.start + Duration::hours(2)))
            .await
            .unwrap();

        let listed = f.repo.list_countable_for_user(f.goal.id, user).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at > listed[1].created_at);
    }
}
