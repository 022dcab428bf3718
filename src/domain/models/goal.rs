//! Group goal domain model.
//!
//! A goal is the shared numeric target a study group works toward. Each
//! goal is either deadline-bound or recurring, never both:
//! - Deadline goals are archived by the maintenance sweep once the deadline passes.
//! - Recurring goals stay active and have their progress zeroed on schedule boundaries.
//!
//! At most one goal per group is active at any time.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::calendar::{start_of_day, start_of_minute};
use super::progress::ProgressSnapshot;

/// Unit a goal's target is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetricKind {
    Count,
    Percentage,
    Time,
}

impl TargetMetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Percentage => "percentage",
            Self::Time => "time",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "count" => Some(Self::Count),
            "percentage" => Some(Self::Percentage),
            "time" => Some(Self::Time),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMetric {
    #[serde(rename = "type")]
    pub kind: TargetMetricKind,
    pub value: i64,
}

impl TargetMetric {
    pub fn count(value: i64) -> Self {
        Self {
            kind: TargetMetricKind::Count,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl RecurrenceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for RecurrenceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reset rule for a recurring goal.
///
/// `reset_day` is 0-6 (Sunday = 0) for weekly goals and 1-31 for monthly
/// goals. `reset_time` is `HH:MM` and only used by daily goals, defaulting
/// to midnight. All fields are evaluated against UTC wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPattern {
    pub frequency: RecurrenceFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<String>,
}

impl RecurringPattern {
    pub fn daily(reset_time: impl Into<String>) -> Self {
        Self {
            frequency: RecurrenceFrequency::Daily,
            reset_day: None,
            reset_time: Some(reset_time.into()),
        }
    }

    pub fn weekly(reset_day: u32) -> Self {
        Self {
            frequency: RecurrenceFrequency::Weekly,
            reset_day: Some(reset_day),
            reset_time: None,
        }
    }

    pub fn monthly(reset_day: u32) -> Self {
        Self {
            frequency: RecurrenceFrequency::Monthly,
            reset_day: Some(reset_day),
            reset_time: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(time) = &self.reset_time {
            parse_reset_time(time)?;
        }
        match self.frequency {
            RecurrenceFrequency::Daily => Ok(()),
            RecurrenceFrequency::Weekly => match self.reset_day {
                Some(day) if day <= 6 => Ok(()),
                _ => Err("Weekly goals need a reset day between 0 (Sunday) and 6".to_string()),
            },
            RecurrenceFrequency::Monthly => match self.reset_day {
                Some(day) if (1..=31).contains(&day) => Ok(()),
                _ => Err("Monthly goals need a reset day between 1 and 31".to_string()),
            },
        }
    }

    /// Whether `now` falls on this pattern's reset boundary.
    ///
    /// Daily goals match on the exact hour and minute, weekly goals on the
    /// weekday and monthly goals on the day of month. A scheduler must tick
    /// at least once per minute for daily matches to be observed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.frequency {
            RecurrenceFrequency::Daily => {
                let (hour, minute) = self
                    .reset_time
                    .as_deref()
                    .and_then(|t| parse_reset_time(t).ok())
                    .unwrap_or((0, 0));
                now.hour() == hour && now.minute() == minute
            }
            RecurrenceFrequency::Weekly => {
                self.reset_day == Some(now.weekday().num_days_from_sunday())
            }
            RecurrenceFrequency::Monthly => self.reset_day == Some(now.day()),
        }
    }

    /// Start of the matching window containing `now`: the current minute for
    /// daily goals, the current day otherwise.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.frequency {
            RecurrenceFrequency::Daily => start_of_minute(now),
            RecurrenceFrequency::Weekly | RecurrenceFrequency::Monthly => start_of_day(now),
        }
    }

    /// Whether a reset should be applied at `now`, given the last reset time.
    pub fn should_reset(&self, now: DateTime<Utc>, last_reset_at: Option<DateTime<Utc>>) -> bool {
        if !self.is_due(now) {
            return false;
        }
        last_reset_at.map_or(true, |last| last < self.window_start(now))
    }
}

/// Parse an `H:MM` / `HH:MM` reset time into (hour, minute).
pub fn parse_reset_time(value: &str) -> Result<(u32, u32), String> {
    let invalid = || format!("Invalid reset time '{value}', expected HH:MM");
    let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// How a goal ends or repeats. Exactly one of the two is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum GoalSchedule {
    Deadline { deadline: DateTime<Utc> },
    Recurring { pattern: RecurringPattern },
}

impl GoalSchedule {
    /// Build a schedule from the two optional inputs, rejecting neither/both.
    pub fn from_parts(
        deadline: Option<DateTime<Utc>>,
        recurring_pattern: Option<RecurringPattern>,
    ) -> Option<Self> {
        match (deadline, recurring_pattern) {
            (Some(deadline), None) => Some(Self::Deadline { deadline }),
            (None, Some(pattern)) => Some(Self::Recurring { pattern }),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Deadline { deadline } => Some(*deadline),
            Self::Recurring { .. } => None,
        }
    }

    pub fn recurring_pattern(&self) -> Option<&RecurringPattern> {
        match self {
            Self::Deadline { .. } => None,
            Self::Recurring { pattern } => Some(pattern),
        }
    }
}

/// Lifecycle state derived from `is_active` / `archived_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalState {
    Active,
    /// Superseded by a newer goal in the same group.
    Inactive,
    /// Deadline elapsed; set by the maintenance sweep. Terminal.
    Archived,
}

impl GoalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        }
    }
}

/// Input for creating a goal.
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub group_id: Uuid,
    pub title: String,
    pub description: String,
    pub subjects: Vec<Uuid>,
    pub target: TargetMetric,
    pub deadline: Option<DateTime<Utc>>,
    pub recurring_pattern: Option<RecurringPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupGoal {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub description: String,
    pub subjects: Vec<Uuid>,
    pub target: TargetMetric,
    pub schedule: GoalSchedule,
    pub is_active: bool,
    pub archived_at: Option<DateTime<Utc>>,
    /// Last recurring reset; progress only counts activity after this point.
    pub last_reset_at: Option<DateTime<Utc>>,
    pub progress: ProgressSnapshot,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupGoal {
    /// Create an active goal with a zeroed progress snapshot.
    pub fn new(input: NewGoal, schedule: GoalSchedule, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: input.group_id,
            title: input.title,
            description: input.description,
            subjects: input.subjects,
            progress: ProgressSnapshot::zeroed(input.target.value, now),
            target: input.target,
            schedule,
            is_active: true,
            archived_at: None,
            last_reset_at: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> GoalState {
        if self.archived_at.is_some() {
            GoalState::Archived
        } else if self.is_active {
            GoalState::Active
        } else {
            GoalState::Inactive
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.schedule.deadline()
    }

    pub fn recurring_pattern(&self) -> Option<&RecurringPattern> {
        self.schedule.recurring_pattern()
    }

    pub fn has_subject(&self, subject_id: Uuid) -> bool {
        self.subjects.contains(&subject_id)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.deadline().is_some_and(|deadline| now > deadline)
    }

    /// Earliest activity timestamp that counts toward current progress.
    pub fn progress_since(&self) -> DateTime<Utc> {
        self.last_reset_at.unwrap_or(self.created_at)
    }

    /// Field-level validation. Temporal rules (deadline in the future) are
    /// checked by the lifecycle service against its clock.
    pub fn validate(&self) -> Result<(), String> {
        let title_len = self.title.chars().count();
        if title_len == 0 || title_len > 100 {
            return Err("Goal title must be between 1 and 100 characters".to_string());
        }
        if self.description.chars().count() > 500 {
            return Err("Description cannot exceed 500 characters".to_string());
        }
        if self.subjects.is_empty() {
            return Err("At least one subject is required".to_string());
        }
        if let Some(pattern) = self.recurring_pattern() {
            pattern.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_schedule_requires_exactly_one() {
        let now = Utc::now();
        assert!(GoalSchedule::from_parts(None, None).is_none());
        assert!(GoalSchedule::from_parts(Some(now), Some(RecurringPattern::weekly(1))).is_none());
        assert!(GoalSchedule::from_parts(Some(now), None).is_some());
        assert!(GoalSchedule::from_parts(None, Some(RecurringPattern::weekly(1))).is_some());
    }

    #[test]
    fn test_parse_reset_time() {
        assert_eq!(parse_reset_time("07:30"), Ok((7, 30)));
        assert_eq!(parse_reset_time("7:05"), Ok((7, 5)));
        assert_eq!(parse_reset_time("23:59"), Ok((23, 59)));
        assert!(parse_reset_time("24:00").is_err());
        assert!(parse_reset_time("12:60").is_err());
        assert!(parse_reset_time("1230").is_err());
        assert!(parse_reset_time("12:5").is_err());
    }

    #[test]
    fn test_daily_due_on_exact_minute() {
        let pattern = RecurringPattern::daily("06:15");
        assert!(pattern.is_due(at(2026, 5, 4, 6, 15)));
        assert!(!pattern.is_due(at(2026, 5, 4, 6, 16)));
    }

    #[test]
    fn test_daily_defaults_to_midnight() {
        let pattern = RecurringPattern {
            frequency: RecurrenceFrequency::Daily,
            reset_day: None,
            reset_time: None,
        };
        assert!(pattern.is_due(at(2026, 5, 4, 0, 0)));
    }

    #[test]
    fn test_weekly_and_monthly_due() {
        // 2026-05-03 is a Sunday
        assert!(RecurringPattern::weekly(0).is_due(at(2026, 5, 3, 12, 0)));
        assert!(!RecurringPattern::weekly(1).is_due(at(2026, 5, 3, 12, 0)));
        assert!(RecurringPattern::monthly(3).is_due(at(2026, 5, 3, 8, 0)));
        assert!(!RecurringPattern::monthly(4).is_due(at(2026, 5, 3, 8, 0)));
    }

    #[test]
    fn test_should_reset_once_per_window() {
        let weekly = RecurringPattern::weekly(0);
        let sunday_morning = at(2026, 5, 3, 8, 0);
        assert!(weekly.should_reset(sunday_morning, None));
        assert!(!weekly.should_reset(sunday_morning + Duration::hours(3), Some(sunday_morning)));
        // Following Sunday is a new window
        assert!(weekly.should_reset(sunday_morning + Duration::days(7), Some(sunday_morning)));

        let daily = RecurringPattern::daily("08:00");
        assert!(!daily.should_reset(sunday_morning + Duration::seconds(30), Some(sunday_morning)));
    }

    #[test]
    fn test_pattern_validation() {
        assert!(RecurringPattern::weekly(7).validate().is_err());
        assert!(RecurringPattern::monthly(0).validate().is_err());
        assert!(RecurringPattern::monthly(31).validate().is_ok());
        assert!(RecurringPattern::daily("25:00").validate().is_err());
    }

    #[test]
    fn test_goal_state() {
        let now = Utc::now();
        let input = NewGoal {
            group_id: Uuid::new_v4(),
            title: "Solve 50".to_string(),
            description: String::new(),
            subjects: vec![Uuid::new_v4()],
            target: TargetMetric::count(50),
            deadline: Some(now + Duration::days(1)),
            recurring_pattern: None,
        };
        let schedule = GoalSchedule::from_parts(input.deadline, None).unwrap();
        let mut goal = GroupGoal::new(input, schedule, Uuid::new_v4(), now);
        assert_eq!(goal.state(), GoalState::Active);
        assert_eq!(goal.progress.completed, 0);
        assert!(!goal.is_expired_at(now));
        assert!(goal.is_expired_at(now + Duration::days(2)));

        goal.is_active = false;
        assert_eq!(goal.state(), GoalState::Inactive);
        goal.archived_at = Some(now);
        assert_eq!(goal.state(), GoalState::Archived);
    }
}
