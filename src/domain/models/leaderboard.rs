//! Leaderboard query and response types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::calendar::{start_of_day, start_of_month};
use super::progress::GoalSummary;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Time window a leaderboard aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    /// Since the start of the current UTC day.
    Day,
    /// Rolling seven days.
    Week,
    /// Since the start of the current UTC month.
    Month,
    /// Since the goal was created.
    #[default]
    All,
}

impl LeaderboardPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn window_start(&self, now: DateTime<Utc>, goal_created_at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Day => start_of_day(now),
            Self::Week => now - Duration::days(7),
            Self::Month => start_of_month(now),
            Self::All => goal_created_at,
        }
    }
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    QuestionsSolved,
    ContributionPercentage,
    TotalTimeSpent,
    UserName,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuestionsSolved => "questionsSolved",
            Self::ContributionPercentage => "contributionPercentage",
            Self::TotalTimeSpent => "totalTimeSpent",
            Self::UserName => "userName",
        }
    }

    /// Parse a sort key; unknown keys fall back to `questionsSolved`.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "contributionPercentage" => Self::ContributionPercentage,
            "totalTimeSpent" => Self::TotalTimeSpent,
            "userName" => Self::UserName,
            _ => Self::QuestionsSolved,
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every parameter that affects a leaderboard result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub period: LeaderboardPeriod,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub subjects: Option<Vec<Uuid>>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            period: LeaderboardPeriod::default(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            subjects: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl LeaderboardQuery {
    pub fn with_period(mut self, period: LeaderboardPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_sort(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    pub fn with_subjects(mut self, subjects: Vec<Uuid>) -> Self {
        self.subjects = Some(subjects);
        self
    }

    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.page == 0 {
            return Err("Page must be a positive integer".to_string());
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(format!("Limit must be between 1 and {MAX_LIMIT}"));
        }
        Ok(())
    }

    fn subjects_key(&self) -> String {
        match &self.subjects {
            Some(subjects) if !subjects.is_empty() => subjects
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(","),
            _ => "all".to_string(),
        }
    }

    /// Cache key covering every parameter, so any change is a miss.
    pub fn cache_key(&self, group_id: Uuid) -> String {
        format!(
            "{}{}:{}:{}:{}:{}:{}",
            leaderboard_key_prefix(group_id),
            self.period,
            self.sort_by,
            self.sort_order,
            self.subjects_key(),
            self.page,
            self.limit
        )
    }
}

/// Prefix shared by every leaderboard cache key of a group.
pub fn leaderboard_key_prefix(group_id: Uuid) -> String {
    format!("leaderboard:{group_id}:")
}

pub fn progress_cache_key(group_id: Uuid) -> String {
    format!("progress:{group_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub user: UserSummary,
    pub questions_solved: u64,
    pub total_time_spent: i64,
    pub last_activity: DateTime<Utc>,
    pub contribution_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_entries: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardFilters {
    pub period: LeaderboardPeriod,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub subjects: Option<Vec<Uuid>>,
}

impl From<&LeaderboardQuery> for LeaderboardFilters {
    fn from(query: &LeaderboardQuery) -> Self {
        Self {
            period: query.period,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
            subjects: query.subjects.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// One page of a leaderboard plus the requester's pinned entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub pagination: Pagination,
    /// The requester's own ranked entry, regardless of page.
    pub current_user: Option<LeaderboardEntry>,
    pub filters: LeaderboardFilters,
    pub goal: GoalSummary,
}
