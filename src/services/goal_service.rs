//! Goal lifecycle service.
//!
//! Owns goal creation under the single-active-goal rule, and the two
//! maintenance transitions: archiving goals whose deadline elapsed and
//! zeroing recurring goals on their schedule boundary.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{GoalSchedule, GroupGoal, NewGoal};
use crate::domain::ports::{Clock, GoalRepository, GroupRepository};
use crate::services::cache_coordinator::CacheCoordinator;

pub struct GoalLifecycleService {
    groups: Arc<dyn GroupRepository>,
    goals: Arc<dyn GoalRepository>,
    cache: Arc<CacheCoordinator>,
    clock: Arc<dyn Clock>,
}

impl GoalLifecycleService {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        goals: Arc<dyn GoalRepository>,
        cache: Arc<CacheCoordinator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            groups,
            goals,
            cache,
            clock,
        }
    }

    /// Create a goal and make it the group's only active goal.
    pub async fn create_goal(&self, input: NewGoal, requester: Uuid) -> DomainResult<GroupGoal> {
        let schedule = GoalSchedule::from_parts(input.deadline, input.recurring_pattern.clone())
            .ok_or(DomainError::InvalidRecurrence)?;

        self.ensure_member(input.group_id, requester).await?;

        if input.target.value <= 0 {
            return Err(DomainError::InvalidTarget(input.target.value));
        }

        let now = self.clock.now();
        if let Some(deadline) = schedule.deadline() {
            if deadline <= now {
                return Err(DomainError::DeadlineInPast(deadline));
            }
        }

        let goal = GroupGoal::new(input, schedule, requester, now);
        goal.validate().map_err(DomainError::ValidationFailed)?;

        let superseded = self.goals.create_active(&goal).await?;
        tracing::info!(
            group_id = %goal.group_id,
            goal_id = %goal.id,
            superseded,
            "Created group goal"
        );

        Ok(goal)
    }

    /// The group's active goal, visible to members only.
    pub async fn get_active_goal(&self, group_id: Uuid, requester: Uuid) -> DomainResult<GroupGoal> {
        self.ensure_member(group_id, requester).await?;
        self.goals
            .get_active(group_id)
            .await?
            .ok_or(DomainError::NoActiveGoal(group_id))
    }

    /// Every goal the group has had, newest first.
    pub async fn list_goals(&self, group_id: Uuid, requester: Uuid) -> DomainResult<Vec<GroupGoal>> {
        self.ensure_member(group_id, requester).await?;
        self.goals.list_by_group(group_id).await
    }

    /// Archive every active goal whose deadline is before `now`, then
    /// invalidate each affected group's cache. Returns the number archived.
    pub async fn archive_expired_goals(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let expired = self.goals.find_expired_active(now).await?;
        if expired.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = expired.iter().map(|g| g.id).collect();
        let archived = self.goals.archive(&ids, now).await?;

        for goal in &expired {
            self.cache.invalidate(goal.group_id).await;
        }

        tracing::info!(archived, "Archived expired goals");
        Ok(archived)
    }

    /// Zero the progress of every recurring goal whose reset rule matches
    /// `now`. A goal is reset at most once per matching window. Returns the
    /// number of goals reset.
    pub async fn apply_recurring_resets(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let goals = self.goals.list_active_recurring().await?;
        let mut reset = 0u64;

        for goal in goals {
            let Some(pattern) = goal.recurring_pattern() else {
                continue;
            };
            if !pattern.should_reset(now, goal.last_reset_at) {
                continue;
            }

            let window_start = pattern.window_start(now);
            if self.goals.reset_progress(goal.id, now, window_start).await? {
                self.cache.invalidate(goal.group_id).await;
                tracing::info!(
                    group_id = %goal.group_id,
                    goal_id = %goal.id,
                    frequency = %pattern.frequency,
                    "Reset recurring goal progress"
                );
                reset += 1;
            }
        }

        Ok(reset)
    }

    async fn ensure_member(&self, group_id: Uuid, user_id: Uuid) -> DomainResult<()> {
        if self.groups.is_member(group_id, user_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotAMember { group_id, user_id })
        }
    }
}
