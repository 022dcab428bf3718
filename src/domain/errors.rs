//! Domain errors for the StudySync core.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::ActivityStatus;

/// Coarse classification of a [`DomainError`], used by outer layers to pick
/// a response shape without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad shape or range. Surfaced to the caller, never retried.
    Validation,
    /// Rejected because of current state. Caller must resubmit with different input.
    StateConflict,
    /// Missing entity or caller not allowed to see it.
    NotFound,
    Forbidden,
    /// Storage or serialization failure.
    Internal,
}

/// Domain-level errors that can occur in the StudySync core.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Either deadline or recurring pattern must be specified, but not both")]
    InvalidRecurrence,

    #[error("User {user_id} is not a member of group {group_id}")]
    NotAMember { group_id: Uuid, user_id: Uuid },

    #[error("Deadline {0} is not in the future")]
    DeadlineInPast(DateTime<Utc>),

    #[error("Target metric value must be positive, got {0}")]
    InvalidTarget(i64),

    #[error("Only 'solved' or 'correct' activities count towards goals, got '{0}'")]
    StatusNotCountable(ActivityStatus),

    #[error("No active goal found for group {0}")]
    NoActiveGoal(Uuid),

    #[error("Subject {0} does not match any of the goal subjects")]
    SubjectMismatch(Uuid),

    #[error("Goal {goal_id} deadline {deadline} has passed")]
    GoalExpired { goal_id: Uuid, deadline: DateTime<Utc> },

    #[error("Activity cannot be recorded before goal {0} was created")]
    ActivityBeforeGoalStart(Uuid),

    #[error("Activity already recorded for user {user_id}, goal {goal_id}, question {question_id}")]
    DuplicateActivity { user_id: Uuid, goal_id: Uuid, question_id: Uuid },

    #[error("Group {0} already has an active goal")]
    ActiveGoalConflict(Uuid),

    #[error("Study group not found: {0}")]
    GroupNotFound(Uuid),

    #[error("Goal not found: {0}")]
    GoalNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Group {0} is full")]
    GroupFull(Uuid),

    #[error("User {0} is already a member of this group")]
    AlreadyMember(Uuid),

    #[error("User {user_id} is already the creator of active group {group_id}")]
    AlreadyCreator { user_id: Uuid, group_id: Uuid },

    #[error("Only the group creator can perform this action")]
    NotGroupCreator,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRecurrence
            | Self::DeadlineInPast(_)
            | Self::InvalidTarget(_)
            | Self::StatusNotCountable(_)
            | Self::SubjectMismatch(_)
            | Self::GoalExpired { .. }
            | Self::ActivityBeforeGoalStart(_)
            | Self::ValidationFailed(_) => ErrorCategory::Validation,
            Self::DuplicateActivity { .. }
            | Self::ActiveGoalConflict(_)
            | Self::GroupFull(_)
            | Self::AlreadyMember(_)
            | Self::AlreadyCreator { .. } => ErrorCategory::StateConflict,
            Self::NoActiveGoal(_)
            | Self::GroupNotFound(_)
            | Self::GoalNotFound(_)
            | Self::UserNotFound(_) => ErrorCategory::NotFound,
            Self::NotAMember { .. } | Self::NotGroupCreator => ErrorCategory::Forbidden,
            Self::DatabaseError(_) | Self::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    /// Stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRecurrence => "INVALID_RECURRENCE",
            Self::NotAMember { .. } => "ACCESS_DENIED",
            Self::DeadlineInPast(_) => "DEADLINE_IN_PAST",
            Self::InvalidTarget(_) => "INVALID_TARGET",
            Self::StatusNotCountable(_) => "INVALID_STATUS",
            Self::NoActiveGoal(_) => "NO_ACTIVE_GOAL",
            Self::SubjectMismatch(_) => "SUBJECT_MISMATCH",
            Self::GoalExpired { .. } => "GOAL_EXPIRED",
            Self::ActivityBeforeGoalStart(_) => "INVALID_TIMESTAMP",
            Self::DuplicateActivity { .. } => "DUPLICATE_ACTIVITY",
            Self::ActiveGoalConflict(_) => "ACTIVE_GOAL_CONFLICT",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::GoalNotFound(_) => "GOAL_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::GroupFull(_) => "GROUP_FULL",
            Self::AlreadyMember(_) => "ALREADY_MEMBER",
            Self::AlreadyCreator { .. } => "ALREADY_CREATOR",
            Self::NotGroupCreator => "NOT_GROUP_CREATOR",
            Self::ValidationFailed(_) => "VALIDATION_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(DomainError::InvalidRecurrence.category(), ErrorCategory::Validation);
        assert_eq!(
            DomainError::DuplicateActivity {
                user_id: Uuid::nil(),
                goal_id: Uuid::nil(),
                question_id: Uuid::nil(),
            }
            .category(),
            ErrorCategory::StateConflict
        );
        assert_eq!(DomainError::NoActiveGoal(Uuid::nil()).category(), ErrorCategory::NotFound);
        assert_eq!(DomainError::NotGroupCreator.category(), ErrorCategory::Forbidden);
        assert_eq!(DomainError::DatabaseError("x".into()).category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_status_not_countable_message() {
        let err = DomainError::StatusNotCountable(ActivityStatus::Attempted);
        assert!(err.to_string().contains("attempted"));
        assert_eq!(err.code(), "INVALID_STATUS");
    }
}
