//! StudySync - collaborative study goals
//!
//! Study groups share one active goal at a time. Members record solved
//! questions against it; the crate keeps the goal's progress current, ranks
//! members on a leaderboard and runs a maintenance sweep that archives
//! expired goals and resets recurring ones.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): goal lifecycle, activity ledger,
//!   progress aggregation, leaderboard, caching and maintenance
//! - **Adapters** (`adapters`): SQLite repositories and the in-process cache
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult, ErrorCategory};
pub use domain::models::{
    ActivityStatus, Config, GroupGoal, GroupMemberActivity, Leaderboard, LeaderboardQuery,
    NewActivity, NewGoal, StudyGroup, UserProfile,
};
pub use domain::ports::{
    ActivityRepository, CacheStore, Clock, GoalRepository, GroupRepository, UserRepository,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ActivityLedger, CacheCoordinator, GoalLifecycleService, GroupService, LeaderboardEngine,
    MaintenanceScheduler, ProgressAggregator,
};
