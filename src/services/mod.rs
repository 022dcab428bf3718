pub mod activity_ledger;
pub mod cache_coordinator;
pub mod goal_service;
pub mod group_service;
pub mod leaderboard_engine;
pub mod maintenance_scheduler;
pub mod progress_aggregator;

pub use activity_ledger::{ActivityLedger, RecordedActivity};
pub use cache_coordinator::{CacheCoordinator, CacheGeneration};
pub use goal_service::GoalLifecycleService;
pub use group_service::GroupService;
pub use leaderboard_engine::LeaderboardEngine;
pub use maintenance_scheduler::{
    MaintenanceScheduler, SchedulerConfig, SchedulerEvent, SchedulerHandle, SchedulerStatus,
    SweepReport,
};
pub use progress_aggregator::ProgressAggregator;
