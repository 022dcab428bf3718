//! Wiring of adapters and services for CLI commands.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::adapters::cache::MokaCacheStore;
use crate::adapters::sqlite::{
    connection::database_url, initialize_database, PoolConfig, SqliteActivityRepository,
    SqliteGoalRepository, SqliteGroupRepository, SqliteUserRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::{
    ActivityRepository, CacheStore, Clock, GoalRepository, GroupRepository, SystemClock,
    UserRepository,
};
use crate::services::{
    ActivityLedger, CacheCoordinator, GoalLifecycleService, GroupService, LeaderboardEngine,
    MaintenanceScheduler, ProgressAggregator, SchedulerConfig,
};

/// Services built from one database pool and one cache.
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub clock: Arc<dyn Clock>,
    pub groups: GroupService,
    pub goals: Arc<GoalLifecycleService>,
    pub ledger: ActivityLedger,
    pub progress: Arc<ProgressAggregator>,
    pub leaderboard: LeaderboardEngine,
}

impl AppContext {
    /// Open the configured database and build every service over it.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = initialize_database(
            &database_url(&config.database.path),
            Some(PoolConfig::from(&config.database)),
        )
        .await
        .context("Failed to initialize database. Run 'studysync init' first.")?;

        Ok(Self::from_pool(config, pool, Arc::new(SystemClock)))
    }

    /// Build services over an existing pool.
    pub fn from_pool(config: Config, pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        let group_repo: Arc<dyn GroupRepository> = Arc::new(SqliteGroupRepository::new(pool.clone()));
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
        let goal_repo: Arc<dyn GoalRepository> = Arc::new(SqliteGoalRepository::new(pool.clone()));
        let activity_repo: Arc<dyn ActivityRepository> =
            Arc::new(SqliteActivityRepository::new(pool.clone()));

        let store: Option<Arc<dyn CacheStore>> = if config.cache.enabled {
            Some(Arc::new(MokaCacheStore::from_config(&config.cache)))
        } else {
            tracing::debug!("Response cache disabled, reads always recompute");
            None
        };
        let cache = Arc::new(
            CacheCoordinator::from_optional(store)
                .with_floor_ttl(Duration::from_secs(config.cache.default_ttl_secs)),
        );

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
        let ledger = ActivityLedger::new(
            group_repo.clone(),
            goal_repo.clone(),
            activity_repo.clone(),
            progress.clone(),
            cache.clone(),
            clock.clone(),
        );
        let leaderboard = LeaderboardEngine::new(group_repo, user_repo, goal_repo, activity_repo, cache, clock.clone());

        Self {
            config,
            pool,
            clock,
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
            SchedulerConfig::from(&self.config.maintenance),
        )
    }
}

/// The acting user for commands that need one.
pub fn require_user(as_user: Option<Uuid>) -> Result<Uuid> {
    as_user.ok_or_else(|| anyhow::anyhow!("This command needs an acting user: pass --as <USER_ID> or set STUDYSYNC_USER"))
}
