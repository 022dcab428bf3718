//! Progress aggregation over the activity ledger.
//!
//! Progress is always a full recount of countable activity since the goal
//! started (or since its last recurring reset), never an incremental
//! counter, so replayed or reordered recomputes converge.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::leaderboard::progress_cache_key;
use crate::domain::models::progress::{capped_percentage, contribution_percentage, remaining, round2};
use crate::domain::models::{
    GoalSummary, GroupGoal, GroupProgressReport, MemberProgress, MembersProgressReport,
    MembersProgressSummary, ProgressSnapshot, RecentActivity, SubjectBreakdown, UserProgress,
    UserProgressReport,
};
use crate::domain::ports::{
    ActivityRepository, ActivityWindow, Clock, GoalRepository, GroupRepository, UserRepository,
};
use crate::services::cache_coordinator::CacheCoordinator;

/// Number of recent activities included in a user progress report.
const RECENT_ACTIVITY_LIMIT: usize = 10;

pub struct ProgressAggregator {
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    goals: Arc<dyn GoalRepository>,
    activities: Arc<dyn ActivityRepository>,
    cache: Arc<CacheCoordinator>,
    clock: Arc<dyn Clock>,
}

impl ProgressAggregator {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
        goals: Arc<dyn GoalRepository>,
        activities: Arc<dyn ActivityRepository>,
        cache: Arc<CacheCoordinator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            groups,
            users,
            goals,
            activities,
            cache,
            clock,
        }
    }

    /// Recount the goal's countable activity and store the snapshot.
    pub async fn recompute(&self, goal_id: Uuid) -> DomainResult<ProgressSnapshot> {
        let goal = self
            .goals
            .get(goal_id)
            .await?
            .ok_or(DomainError::GoalNotFound(goal_id))?;
        self.recompute_goal(&goal).await
    }

    async fn recompute_goal(&self, goal: &GroupGoal) -> DomainResult<ProgressSnapshot> {
        let since = goal.progress_since();
        let completed = self.activities.count_countable(goal.id, since).await?;
        let snapshot = ProgressSnapshot::from_count(completed, goal.target.value, self.clock.now());

        if self.goals.update_progress(goal.id, &snapshot, since).await? {
            tracing::debug!(
                goal_id = %goal.id,
                completed,
                percentage = snapshot.percentage,
                "Recomputed goal progress"
            );
            return Ok(snapshot);
        }

        // A reset landed after we read the goal; recount from the new baseline.
        tracing::debug!(goal_id = %goal.id, "Goal reset during recompute, retrying");
        let current = self
            .goals
            .get(goal.id)
            .await?
            .ok_or(DomainError::GoalNotFound(goal.id))?;
        let since = current.progress_since();
        let completed = self.activities.count_countable(current.id, since).await?;
        let snapshot = ProgressSnapshot::from_count(completed, current.target.value, self.clock.now());
        self.goals.update_progress(current.id, &snapshot, since).await?;
        Ok(snapshot)
    }

    /// Group progress toward the active goal, served from cache when possible.
    pub async fn get_group_progress(
        &self,
        group_id: Uuid,
        requester: Uuid,
    ) -> DomainResult<GroupProgressReport> {
        self.ensure_member(group_id, requester).await?;

        let key = progress_cache_key(group_id);
        let generation = self.cache.generation(group_id);
        if let Some(report) = self.cache.get_json::<GroupProgressReport>(&key).await {
            return Ok(report);
        }

        let goal = self.active_goal(group_id).await?;
        let snapshot = self.recompute_goal(&goal).await?;
        let report = GroupProgressReport::new(&goal, &snapshot);

        let ttl = self.cache.ttl_for(goal.deadline(), self.clock.now());
        self.cache.set_json(&key, &report, ttl, generation).await;
        Ok(report)
    }

    /// One member's contribution to the active goal.
    pub async fn get_user_progress(
        &self,
        group_id: Uuid,
        requester: Uuid,
        user_id: Uuid,
    ) -> DomainResult<UserProgressReport> {
        self.ensure_member(group_id, requester).await?;
        self.ensure_member(group_id, user_id).await?;

        let goal = self.active_goal(group_id).await?;
        let since = goal.progress_since();
        let activities: Vec<_> = self
            .activities
            .list_countable_for_user(goal.id, user_id)
            .await?
            .into_iter()
            .filter(|a| a.created_at >= since)
            .collect();

        let questions_solved = activities.len() as u64;
        let total_time_spent: i64 = activities.iter().map(|a| a.time_spent).sum();
        let target = goal.target.value;

        let subject_breakdown = goal
            .subjects
            .iter()
            .map(|subject| {
                let matching = activities.iter().filter(|a| a.subject_id == *subject);
                SubjectBreakdown {
                    subject_id: *subject,
                    questions_solved: matching.clone().count() as u64,
                    time_spent: matching.map(|a| a.time_spent).sum(),
                }
            })
            .collect();

        let recent_activities = activities
            .iter()
            .take(RECENT_ACTIVITY_LIMIT)
            .map(|a| RecentActivity {
                id: a.id,
                question_id: a.question_id,
                subject_id: a.subject_id,
                time_spent: a.time_spent,
                completed_at: a.created_at,
            })
            .collect();

        let user_name = self
            .users
            .get(user_id)
            .await?
            .map_or_else(|| user_id.to_string(), |u| u.name);

        Ok(UserProgressReport {
            user_id,
            user_name,
            goal: GoalSummary::brief(&goal),
            progress: UserProgress {
                questions_solved,
                total_time_spent,
                contribution_percentage: round2(contribution_percentage(questions_solved, target)),
                remaining_questions: remaining(questions_solved, target),
                is_completed: i64::try_from(questions_solved).unwrap_or(i64::MAX) >= target,
            },
            subject_breakdown,
            recent_activities,
        })
    }

    /// Every member's standing, highest contributors first. Members with no
    /// activity are listed with zero counts.
    pub async fn get_members_progress(
        &self,
        group_id: Uuid,
        requester: Uuid,
    ) -> DomainResult<MembersProgressReport> {
        let group = self
            .groups
            .get(group_id)
            .await?
            .ok_or(DomainError::GroupNotFound(group_id))?;
        if !group.is_member(requester) {
            return Err(DomainError::NotAMember {
                group_id,
                user_id: requester,
            });
        }

        let goal = self.active_goal(group_id).await?;
        let target = goal.target.value;
        let window = ActivityWindow {
            start: goal.progress_since(),
            end: self.clock.now(),
            subjects: None,
        };
        let contributions: HashMap<Uuid, _> = self
            .activities
            .aggregate_by_user(goal.id, &window)
            .await?
            .into_iter()
            .map(|c| (c.user_id, c))
            .collect();
        let users = self.users.get_many(&group.members).await?;

        let mut members_progress: Vec<MemberProgress> = group
            .members
            .iter()
            .map(|member| {
                let contribution = contributions.get(member);
                let questions_solved = contribution.map_or(0, |c| c.questions_solved);
                MemberProgress {
                    user_id: *member,
                    user_name: users
                        .get(member)
                        .map_or_else(|| member.to_string(), |u| u.name.clone()),
                    questions_solved,
                    total_time_spent: contribution.map_or(0, |c| c.total_time_spent),
                    last_activity: contribution.map(|c| c.last_activity),
                    contribution_percentage: round2(contribution_percentage(questions_solved, target)),
                    is_completed: i64::try_from(questions_solved).unwrap_or(i64::MAX) >= target,
                }
            })
            .collect();
        members_progress.sort_by(|a, b| b.questions_solved.cmp(&a.questions_solved));

        let total_questions_solved: u64 = members_progress.iter().map(|m| m.questions_solved).sum();
        let summary = MembersProgressSummary {
            total_members: members_progress.len(),
            completed_members: members_progress.iter().filter(|m| m.is_completed).count(),
            total_questions_solved,
            group_progress_percentage: capped_percentage(total_questions_solved, target),
        };

        Ok(MembersProgressReport {
            goal: GoalSummary::brief(&goal),
            members_progress,
            summary,
        })
    }

    async fn active_goal(&self, group_id: Uuid) -> DomainResult<GroupGoal> {
        self.goals
            .get_active(group_id)
            .await?
            .ok_or(DomainError::NoActiveGoal(group_id))
    }

    async fn ensure_member(&self, group_id: Uuid, user_id: Uuid) -> DomainResult<()> {
        if self.groups.is_member(group_id, user_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotAMember { group_id, user_id })
        }
    }
}
