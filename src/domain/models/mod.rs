pub mod activity;
pub mod calendar;
pub mod config;
pub mod goal;
pub mod group;
pub mod leaderboard;
pub mod progress;

pub use activity::{ActivityStatus, GroupMemberActivity, NewActivity, UserContribution};
pub use config::{CacheConfig, Config, DatabaseConfig, LoggingConfig, MaintenanceConfig};
pub use goal::{
    GoalSchedule, GoalState, GroupGoal, NewGoal, RecurrenceFrequency, RecurringPattern,
    TargetMetric, TargetMetricKind,
};
pub use group::{StudyGroup, UserProfile, DEFAULT_GROUP_MEMBERS, MAX_GROUP_MEMBERS};
pub use leaderboard::{
    Leaderboard, LeaderboardEntry, LeaderboardFilters, LeaderboardPeriod, LeaderboardQuery,
    Pagination, SortBy, SortOrder, UserSummary,
};
pub use progress::{
    GoalSummary, GroupProgressReport, MemberProgress, MembersProgressReport,
    MembersProgressSummary, ProgressDetail, ProgressSnapshot, RecentActivity, SubjectBreakdown,
    UserProgress, UserProgressReport,
};
