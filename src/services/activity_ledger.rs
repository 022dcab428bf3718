//! Activity ledger service.
//!
//! Validates a submission against the group's active goal, appends it, then
//! recomputes progress and invalidates the group's cache, in that order.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{GroupMemberActivity, NewActivity, ProgressSnapshot};
use crate::domain::ports::{ActivityRepository, Clock, GoalRepository, GroupRepository};
use crate::services::cache_coordinator::CacheCoordinator;
use crate::services::progress_aggregator::ProgressAggregator;

/// Outcome of a successful write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedActivity {
    pub activity: GroupMemberActivity,
    /// Fresh progress snapshot, or `None` when the recompute failed and the
    /// stored progress is stale until the next recompute.
    pub progress: Option<ProgressSnapshot>,
}

impl RecordedActivity {
    pub fn progress_is_stale(&self) -> bool {
        self.progress.is_none()
    }
}

pub struct ActivityLedger {
    groups: Arc<dyn GroupRepository>,
    goals: Arc<dyn GoalRepository>,
    activities: Arc<dyn ActivityRepository>,
    progress: Arc<ProgressAggregator>,
    cache: Arc<CacheCoordinator>,
    clock: Arc<dyn Clock>,
}

impl ActivityLedger {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        goals: Arc<dyn GoalRepository>,
        activities: Arc<dyn ActivityRepository>,
        progress: Arc<ProgressAggregator>,
        cache: Arc<CacheCoordinator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            groups,
            goals,
            activities,
            progress,
            cache,
            clock,
        }
    }

    /// Record a countable activity against the group's active goal.
    pub async fn record_activity(&self, input: NewActivity) -> DomainResult<RecordedActivity> {
        if !input.status.is_countable() {
            return Err(DomainError::StatusNotCountable(input.status));
        }

        if !self.groups.is_member(input.group_id, input.user_id).await? {
            return Err(DomainError::NotAMember {
                group_id: input.group_id,
                user_id: input.user_id,
            });
        }

        let goal = self
            .goals
            .get_active(input.group_id)
            .await?
            .ok_or(DomainError::NoActiveGoal(input.group_id))?;

        if !goal.has_subject(input.subject_id) {
            return Err(DomainError::SubjectMismatch(input.subject_id));
        }

        let now = self.clock.now();
        if let Some(deadline) = goal.deadline() {
            if now > deadline {
                return Err(DomainError::GoalExpired {
                    goal_id: goal.id,
                    deadline,
                });
            }
        }
        if now < goal.created_at {
            return Err(DomainError::ActivityBeforeGoalStart(goal.id));
        }

        if self
            .activities
            .exists(input.user_id, goal.id, input.question_id)
            .await?
        {
            return Err(DomainError::DuplicateActivity {
                user_id: input.user_id,
                goal_id: goal.id,
                question_id: input.question_id,
            });
        }

        // The storage constraint settles concurrent submissions the pre-check missed
        let activity = GroupMemberActivity::new(input, goal.id, now);
        self.activities.insert(&activity).await?;
        tracing::info!(
            group_id = %activity.group_id,
            goal_id = %activity.goal_id,
            user_id = %activity.user_id,
            question_id = %activity.question_id,
            "Recorded activity"
        );

        let progress = match self.progress.recompute(goal.id).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(
                    goal_id = %goal.id,
                    error = %e,
                    "Progress recompute failed after activity write, progress is stale"
                );
                None
            }
        };

        self.cache.invalidate(activity.group_id).await;

        Ok(RecordedActivity { activity, progress })
    }

    /// Whether the user already contributed this question to the group's
    /// active goal.
    pub async fn has_recorded(&self, group_id: Uuid, user_id: Uuid, question_id: Uuid) -> DomainResult<bool> {
        match self.goals.get_active(group_id).await? {
            Some(goal) => self.activities.exists(user_id, goal.id, question_id).await,
            None => Ok(false),
        }
    }
}
