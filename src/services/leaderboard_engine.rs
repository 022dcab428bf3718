//! Leaderboard computation: windowed aggregation, sorting, ranking and
//! pagination of per-member contributions to a group's active goal.
//!
//! Ranking rules:
//! - Sorting is stable. Entries that compare equal keep the aggregate's
//!   order (first contribution in the window, then user id).
//! - Tied entries share a rank. The next distinct value is ranked by its
//!   1-based position, so `[5, 5, 3]` ranks as `[1, 1, 3]`.
//! - `contributionPercentage` is compared unrounded and rounded to two
//!   decimals only for output.

use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::progress::{contribution_percentage, round2};
use crate::domain::models::{
    GoalSummary, Leaderboard, LeaderboardEntry, LeaderboardFilters, LeaderboardQuery, Pagination,
    SortBy, SortOrder, UserContribution, UserSummary,
};
use crate::domain::ports::{
    ActivityRepository, ActivityWindow, Clock, GoalRepository, GroupRepository, UserRepository,
};
use crate::services::cache_coordinator::CacheCoordinator;

/// A contribution joined with its display identity, before ranking.
#[derive(Debug, Clone)]
pub struct Standing {
    pub user: UserSummary,
    pub contribution: UserContribution,
    /// Unrounded contribution percentage.
    pub contribution_percentage: f64,
}

impl Standing {
    pub fn new(contribution: UserContribution, user: UserSummary, target: i64) -> Self {
        Self {
            contribution_percentage: contribution_percentage(contribution.questions_solved, target),
            user,
            contribution,
        }
    }

    fn compare(&self, other: &Self, sort_by: SortBy) -> Ordering {
        match sort_by {
            SortBy::QuestionsSolved => self
                .contribution
                .questions_solved
                .cmp(&other.contribution.questions_solved),
            SortBy::ContributionPercentage => self
                .contribution_percentage
                .total_cmp(&other.contribution_percentage),
            SortBy::TotalTimeSpent => self
                .contribution
                .total_time_spent
                .cmp(&other.contribution.total_time_spent),
            SortBy::UserName => self
                .user
                .name
                .to_lowercase()
                .cmp(&other.user.name.to_lowercase()),
        }
    }

    fn into_entry(self, rank: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            rank,
            user_id: self.contribution.user_id,
            user: self.user,
            questions_solved: self.contribution.questions_solved,
            total_time_spent: self.contribution.total_time_spent,
            last_activity: self.contribution.last_activity,
            contribution_percentage: round2(self.contribution_percentage),
        }
    }
}

/// Stable sort by the selected key.
pub fn sort_standings(standings: &mut [Standing], sort_by: SortBy, sort_order: SortOrder) {
    standings.sort_by(|a, b| match sort_order {
        SortOrder::Asc => a.compare(b, sort_by),
        SortOrder::Desc => b.compare(a, sort_by),
    });
}

/// Assign ranks to an already sorted sequence.
pub fn rank_standings(standings: Vec<Standing>, sort_by: SortBy) -> Vec<LeaderboardEntry> {
    let mut rank = 0u32;
    let ranks: Vec<u32> = (0..standings.len())
        .map(|i| {
            if i == 0 || standings[i - 1].compare(&standings[i], sort_by) != Ordering::Equal {
                rank = u32::try_from(i + 1).unwrap_or(u32::MAX);
            }
            rank
        })
        .collect();

    standings
        .into_iter()
        .zip(ranks)
        .map(|(standing, rank)| standing.into_entry(rank))
        .collect()
}

/// Slice one 1-based page out of the ranked sequence.
pub fn paginate(entries: &[LeaderboardEntry], page: u32, limit: u32) -> (Vec<LeaderboardEntry>, Pagination) {
    let total = entries.len();
    let limit_len = limit.max(1) as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(limit_len);
    let end = start.saturating_add(limit_len);

    let slice = entries
        .iter()
        .skip(start)
        .take(limit_len)
        .cloned()
        .collect();

    let pagination = Pagination {
        current_page: page,
        total_pages: u32::try_from(total.div_ceil(limit_len)).unwrap_or(u32::MAX),
        total_entries: total,
        has_next_page: end < total,
        has_prev_page: page > 1,
    };

    (slice, pagination)
}

pub struct LeaderboardEngine {
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    goals: Arc<dyn GoalRepository>,
    activities: Arc<dyn ActivityRepository>,
    cache: Arc<CacheCoordinator>,
    clock: Arc<dyn Clock>,
}

impl LeaderboardEngine {
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

    /// Ranked, paginated contributions to the group's active goal, with the
    /// requester's own entry pinned regardless of page.
    pub async fn compute_leaderboard(
        &self,
        group_id: Uuid,
        query: &LeaderboardQuery,
        requester: Uuid,
    ) -> DomainResult<Leaderboard> {
        query.validate().map_err(DomainError::ValidationFailed)?;

        if !self.groups.is_member(group_id, requester).await? {
            return Err(DomainError::NotAMember {
                group_id,
                user_id: requester,
            });
        }

        let goal = self
            .goals
            .get_active(group_id)
            .await?
            .ok_or(DomainError::NoActiveGoal(group_id))?;

        // The cached value is the full ranking; page and pin are per request
        let key = query.cache_key(group_id);
        let generation = self.cache.generation(group_id);
        let ranked = match self.cache.get_json::<Vec<LeaderboardEntry>>(&key).await {
            Some(ranked) => ranked,
            None => {
                let now = self.clock.now();
                let window = ActivityWindow {
                    start: query.period.window_start(now, goal.created_at),
                    end: now,
                    subjects: query.subjects.clone(),
                };
                let contributions = self.activities.aggregate_by_user(goal.id, &window).await?;
                let mut standings = self.join_users(contributions, goal.target.value).await?;
                sort_standings(&mut standings, query.sort_by, query.sort_order);
                let ranked = rank_standings(standings, query.sort_by);

                self.cache
                    .set_json(&key, &ranked, self.cache.ttl_for(goal.deadline(), now), generation)
                    .await;
                tracing::debug!(
                    group_id = %group_id,
                    entries = ranked.len(),
                    period = %query.period,
                    "Computed leaderboard"
                );
                ranked
            }
        };

        let current_user = ranked.iter().find(|e| e.user_id == requester).cloned();
        let (leaderboard, pagination) = paginate(&ranked, query.page, query.limit);

        Ok(Leaderboard {
            leaderboard,
            pagination,
            current_user,
            filters: LeaderboardFilters::from(query),
            goal: GoalSummary::brief(&goal),
        })
    }

    async fn join_users(
        &self,
        contributions: Vec<UserContribution>,
        target: i64,
    ) -> DomainResult<Vec<Standing>> {
        let ids: Vec<Uuid> = contributions.iter().map(|c| c.user_id).collect();
        let users = self.users.get_many(&ids).await?;

        Ok(contributions
            .into_iter()
            .map(|contribution| {
                let user = users.get(&contribution.user_id).map_or_else(
                    || UserSummary {
                        id: contribution.user_id,
                        name: contribution.user_id.to_string(),
                        email: String::new(),
                    },
                    |profile| UserSummary {
                        id: profile.id,
                        name: profile.name.clone(),
                        email: profile.email.clone(),
                    },
                );
                Standing::new(contribution, user, target)
            })
            .collect())
    }
}
