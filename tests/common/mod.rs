//! Common test utilities for integration tests
//!
//! Builds the full service graph over an in-memory SQLite database, a
//! settable clock and a pluggable cache store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::Notify;
use uuid::Uuid;

use studysync::adapters::cache::MokaCacheStore;
use studysync::adapters::sqlite::{
    create_migrated_test_pool, SqliteActivityRepository, SqliteGoalRepository,
    SqliteGroupRepository, SqliteUserRepository,
};
use studysync::domain::errors::DomainResult;
use studysync::domain::models::{
    ActivityStatus, GroupGoal, GroupMemberActivity, NewActivity, NewGoal, RecurringPattern,
    StudyGroup, TargetMetric, UserContribution, UserProfile,
};
use studysync::domain::ports::{
    ActivityRepository, ActivityWindow, CacheError, CacheStore, Clock, GoalRepository, ManualClock,
};
use studysync::services::{
    ActivityLedger, CacheCoordinator, GoalLifecycleService, GroupService, LeaderboardEngine,
    MaintenanceScheduler, ProgressAggregator, RecordedActivity, SchedulerConfig,
};

/// Monday 2 March 2026, 08:00 UTC.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Every service wired over one database.
pub struct TestApp {
    pub pool: SqlitePool,
    pub clock: Arc<ManualClock>,
    pub goal_repo: Arc<SqliteGoalRepository>,
    pub groups: GroupService,
    pub goals: Arc<GoalLifecycleService>,
    pub ledger: Arc<ActivityLedger>,
    pub progress: Arc<ProgressAggregator>,
    pub leaderboard: LeaderboardEngine,
}

impl TestApp {
    /// In-memory database with an in-process cache.
    pub async fn new() -> Self {
        Self::with_store(Some(Arc::new(MokaCacheStore::new()))).await
    }

    /// In-memory database with the given cache store, or none.
    pub async fn with_store(store: Option<Arc<dyn CacheStore>>) -> Self {
        let pool = create_migrated_test_pool().await.unwrap();
        Self::with_pool(pool, store)
    }

    pub fn with_pool(pool: SqlitePool, store: Option<Arc<dyn CacheStore>>) -> Self {
        let activity_repo = Arc::new(SqliteActivityRepository::new(pool.clone()));
        Self::with_activities(pool, store, activity_repo)
    }

    /// Services over the given activity repository instead of the plain one.
    pub fn with_activities(
        pool: SqlitePool,
        store: Option<Arc<dyn CacheStore>>,
        activity_repo: Arc<dyn ActivityRepository>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let group_repo = Arc::new(SqliteGroupRepository::new(pool.clone()));
        let user_repo = Arc::new(SqliteUserRepository::new(pool.clone()));
        let goal_repo = Arc::new(SqliteGoalRepository::new(pool.clone()));
        let cache = Arc::new(CacheCoordinator::from_optional(store));

        let groups = GroupService::new(group_repo.clone(), user_repo.clone(), cache.clone(), clock.clone());
        let goals = Arc::new(GoalLifecycleService::new(
            group_repo.clone(),
            goal_repo.clone(),
            cache.clone(),
            clock.clone(),
        ));
        let progress = Arc::new(ProgressAggregator::new(
            group_repo.clone(),
            user_repo.clone(),
            goal_repo.clone(),
            activity_repo.clone(),
            cache.clone(),
            clock.clone(),
        ));
        let ledger = Arc::new(ActivityLedger::new(
            group_repo.clone(),
            goal_repo.clone(),
            activity_repo.clone(),
            progress.clone(),
            cache.clone(),
            clock.clone(),
        ));
        let leaderboard = LeaderboardEngine::new(
            group_repo,
            user_repo,
            goal_repo.clone(),
            activity_repo,
            cache,
            clock.clone(),
        );

        Self {
            pool,
            clock,
            goal_repo,
            groups,
            goals,
            ledger,
            progress,
            leaderboard,
        }
    }

    pub fn scheduler(&self) -> MaintenanceScheduler {
        MaintenanceScheduler::new(
            self.goals.clone(),
            self.clock.clone(),
            SchedulerConfig {
                interval: StdDuration::from_millis(20),
                initial_delay: StdDuration::ZERO,
            },
        )
    }

    pub async fn user(&self, name: &str) -> UserProfile {
        let email = format!("{}@example.com", name.to_lowercase());
        self.groups.register_user(name, &email).await.unwrap()
    }

    /// Group owned by `creator` with the given extra members.
    pub async fn group(&self, creator: &UserProfile, members: &[&UserProfile]) -> StudyGroup {
        let mut group = self
            .groups
            .create_group(format!("{}'s group", creator.name), None, None, creator.id)
            .await
            .unwrap();
        for member in members {
            group = self.groups.add_member(group.id, creator.id, member.id).await.unwrap();
        }
        group
    }

    /// Count goal over one subject with a deadline `hours` from now.
    pub async fn deadline_goal(&self, group: &StudyGroup, target: i64, hours: i64) -> GroupGoal {
        let input = NewGoal {
            group_id: group.id,
            title: "Weekly sprint".to_string(),
            description: String::new(),
            subjects: vec![Uuid::new_v4()],
            target: TargetMetric::count(target),
            deadline: Some(self.clock.now() + Duration::hours(hours)),
            recurring_pattern: None,
        };
        self.goals.create_goal(input, group.creator).await.unwrap()
    }

    pub async fn recurring_goal(&self, group: &StudyGroup, target: i64, pattern: RecurringPattern) -> GroupGoal {
        let input = NewGoal {
            group_id: group.id,
            title: "Daily practice".to_string(),
            description: String::new(),
            subjects: vec![Uuid::new_v4()],
            target: TargetMetric::count(target),
            deadline: None,
            recurring_pattern: Some(pattern),
        };
        self.goals.create_goal(input, group.creator).await.unwrap()
    }

    /// Record one solved question on the goal's first subject.
    pub async fn solve(&self, goal: &GroupGoal, user_id: Uuid) -> DomainResult<RecordedActivity> {
        self.ledger.record_activity(submission(goal, user_id)).await
    }

    /// Record `count` solved questions, one minute apart.
    pub async fn solve_many(&self, goal: &GroupGoal, user_id: Uuid, count: usize) {
        for _ in 0..count {
            self.clock.advance(Duration::minutes(1));
            self.solve(goal, user_id).await.unwrap();
        }
    }

    pub async fn stored_goal(&self, goal_id: Uuid) -> GroupGoal {
        self.goal_repo.get(goal_id).await.unwrap().unwrap()
    }
}

pub fn submission(goal: &GroupGoal, user_id: Uuid) -> NewActivity {
    NewActivity {
        group_id: goal.group_id,
        user_id,
        question_id: Uuid::new_v4(),
        subject_id: goal.subjects[0],
        status: ActivityStatus::Solved,
        time_spent: 60,
    }
}

/// Cache store whose every call fails.
#[derive(Default)]
pub struct FailingCacheStore {
    pub calls: AtomicUsize,
}

impl FailingCacheStore {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: String, _ttl: StdDuration) -> Result<(), CacheError> {
        self.fail()
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        self.fail()
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        self.fail()
    }
}

/// One-shot pause point: the first caller after `arm` stops until `release`.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    reached: Notify,
    resume: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until a caller is parked at the gate.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.resume.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.resume.notified().await;
        }
    }
}

/// Activity repository that can hold a read after it has hit the database,
/// so a write can be slotted in before the reader acts on its result.
pub struct GatedActivityRepository {
    inner: SqliteActivityRepository,
    pub after_aggregate: Gate,
    pub after_count: Gate,
}

impl GatedActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteActivityRepository::new(pool),
            after_aggregate: Gate::default(),
            after_count: Gate::default(),
        }
    }
}

#[async_trait]
impl ActivityRepository for GatedActivityRepository {
    async fn insert(&self, activity: &GroupMemberActivity) -> DomainResult<()> {
        self.inner.insert(activity).await
    }

    async fn exists(&self, user_id: Uuid, goal_id: Uuid, question_id: Uuid) -> DomainResult<bool> {
        self.inner.exists(user_id, goal_id, question_id).await
    }

    async fn count_countable(&self, goal_id: Uuid, since: DateTime<Utc>) -> DomainResult<u64> {
        let count = self.inner.count_countable(goal_id, since).await?;
        self.after_count.pass().await;
        Ok(count)
    }

    async fn aggregate_by_user(
        &self,
        goal_id: Uuid,
        window: &ActivityWindow,
    ) -> DomainResult<Vec<UserContribution>> {
        let contributions = self.inner.aggregate_by_user(goal_id, window).await?;
        self.after_aggregate.pass().await;
        Ok(contributions)
    }

    async fn list_countable_for_user(
        &self,
        goal_id: Uuid,
        user_id: Uuid,
    ) -> DomainResult<Vec<GroupMemberActivity>> {
        self.inner.list_countable_for_user(goal_id, user_id).await
    }
}
