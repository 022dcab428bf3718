//! Member activity domain model.
//!
//! Activities are immutable ledger events. A member contributes at most one
//! event per (user, goal, question).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Outcome of a member working a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Attempted,
    Solved,
    Correct,
}

impl ActivityStatus {
    /// Statuses that count toward progress and leaderboard metrics.
    pub const COUNTABLE: [Self; 2] = [Self::Solved, Self::Correct];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attempted => "attempted",
            Self::Solved => "solved",
            Self::Correct => "correct",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "attempted" => Some(Self::Attempted),
            "solved" => Some(Self::Solved),
            "correct" => Some(Self::Correct),
            _ => None,
        }
    }

    pub fn is_countable(&self) -> bool {
        matches!(self, Self::Solved | Self::Correct)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for recording an activity. The goal is resolved by the ledger.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub subject_id: Uuid,
    pub status: ActivityStatus,
    /// Seconds spent; negative values are clamped to zero.
    pub time_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub goal_id: Uuid,
    pub question_id: Uuid,
    pub subject_id: Uuid,
    pub status: ActivityStatus,
    pub time_spent: i64,
    pub created_at: DateTime<Utc>,
}

impl GroupMemberActivity {
    pub fn new(input: NewActivity, goal_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            group_id: input.group_id,
            goal_id,
            question_id: input.question_id,
            subject_id: input.subject_id,
            status: input.status,
            time_spent: input.time_spent.max(0),
            created_at: now,
        }
    }
}

/// Per-user aggregate over countable activities in a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContribution {
    pub user_id: Uuid,
    pub questions_solved: u64,
    pub total_time_spent: i64,
    pub last_activity: DateTime<Utc>,
}
