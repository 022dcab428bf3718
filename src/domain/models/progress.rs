//! Progress snapshots and progress read models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::goal::{GroupGoal, TargetMetricKind};

/// Round to two decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Group completion percentage, capped at 100 and rounded to 2 decimals.
/// A non-positive target yields 0.
pub fn capped_percentage(completed: u64, target: i64) -> f64 {
    if target <= 0 {
        return 0.0;
    }
    round2((completed as f64 / target as f64 * 100.0).min(100.0))
}

/// Individual contribution percentage. Not capped: one member may exceed the
/// whole group target.
pub fn contribution_percentage(solved: u64, target: i64) -> f64 {
    if target <= 0 {
        return 0.0;
    }
    solved as f64 / target as f64 * 100.0
}

/// Cached completion summary stored on the goal itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub total: i64,
    pub completed: u64,
    pub percentage: f64,
    pub last_updated: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn zeroed(total: i64, now: DateTime<Utc>) -> Self {
        Self {
            total,
            completed: 0,
            percentage: 0.0,
            last_updated: now,
        }
    }

    pub fn from_count(completed: u64, target: i64, now: DateTime<Utc>) -> Self {
        Self {
            total: target,
            completed,
            percentage: capped_percentage(completed, target),
            last_updated: now,
        }
    }
}

/// Goal fields echoed back alongside progress and leaderboard payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSummary {
    pub id: Uuid,
    pub title: String,
    pub target_value: i64,
    pub target_type: TargetMetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Uuid>,
}

impl GoalSummary {
    pub fn brief(goal: &GroupGoal) -> Self {
        Self {
            id: goal.id,
            title: goal.title.clone(),
            target_value: goal.target.value,
            target_type: goal.target.kind,
            deadline: None,
            subjects: Vec::new(),
        }
    }

    pub fn detailed(goal: &GroupGoal) -> Self {
        Self {
            deadline: goal.deadline(),
            subjects: goal.subjects.clone(),
            ..Self::brief(goal)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDetail {
    pub current: u64,
    pub target: i64,
    pub percentage: f64,
    pub remaining: u64,
    pub last_updated: DateTime<Utc>,
}

/// Group-level progress payload served through the `progress:{group}` cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupProgressReport {
    pub goal: GoalSummary,
    pub progress: ProgressDetail,
}

impl GroupProgressReport {
    pub fn new(goal: &GroupGoal, snapshot: &ProgressSnapshot) -> Self {
        let target = goal.target.value;
        Self {
            goal: GoalSummary::detailed(goal),
            progress: ProgressDetail {
                current: snapshot.completed,
                target,
                percentage: snapshot.percentage,
                remaining: remaining(snapshot.completed, target),
                last_updated: snapshot.last_updated,
            },
        }
    }
}

pub fn remaining(completed: u64, target: i64) -> u64 {
    (target.max(0) as u64).saturating_sub(completed)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectBreakdown {
    pub subject_id: Uuid,
    pub questions_solved: u64,
    pub time_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub id: Uuid,
    pub question_id: Uuid,
    pub subject_id: Uuid,
    pub time_spent: i64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub questions_solved: u64,
    pub total_time_spent: i64,
    pub contribution_percentage: f64,
    pub remaining_questions: u64,
    pub is_completed: bool,
}

/// One member's standing toward the active goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgressReport {
    pub user_id: Uuid,
    pub user_name: String,
    pub goal: GoalSummary,
    pub progress: UserProgress,
    pub subject_breakdown: Vec<SubjectBreakdown>,
    pub recent_activities: Vec<RecentActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProgress {
    pub user_id: Uuid,
    pub user_name: String,
    pub questions_solved: u64,
    pub total_time_spent: i64,
    pub last_activity: Option<DateTime<Utc>>,
    pub contribution_percentage: f64,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersProgressSummary {
    pub total_members: usize,
    pub completed_members: usize,
    pub total_questions_solved: u64,
    pub group_progress_percentage: f64,
}

/// Every member of the group, contributors first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersProgressReport {
    pub goal: GoalSummary,
    pub members_progress: Vec<MemberProgress>,
    pub summary: MembersProgressSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capped_percentage() {
        assert!((capped_percentage(13, 10) - 100.0).abs() < f64::EPSILON);
        assert!((capped_percentage(1, 3) - 33.33).abs() < f64::EPSILON);
        assert!((capped_percentage(5, 0)).abs() < f64::EPSILON);
        assert!((capped_percentage(5, -4)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contribution_uncapped() {
        assert!((contribution_percentage(13, 10) - 130.0).abs() < 1e-9);
        assert!((contribution_percentage(3, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_remaining_never_negative() {
        assert_eq!(remaining(13, 10), 0);
        assert_eq!(remaining(4, 10), 6);
    }

    #[test]
    fn test_snapshot_from_count() {
        let snapshot = ProgressSnapshot::from_count(7, 20, Utc::now());
        assert_eq!(snapshot.completed, 7);
        assert_eq!(snapshot.total, 20);
        assert!((snapshot.percentage - 35.0).abs() < f64::EPSILON);
    }
}
