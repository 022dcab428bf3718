//! Integration tests for cache invalidation and degraded-cache behavior.

mod common;

use chrono::Duration;
use common::{FailingCacheStore, GatedActivityRepository, TestApp};
use std::sync::Arc;

use studysync::adapters::cache::MokaCacheStore;
use studysync::adapters::sqlite::create_migrated_test_pool;
use studysync::domain::models::leaderboard::progress_cache_key;
use studysync::domain::models::{LeaderboardPeriod, LeaderboardQuery};
use studysync::domain::ports::{CacheStore, Clock};

#[tokio::test]
async fn test_activity_write_invalidates_group_entries() {
    let store = Arc::new(MokaCacheStore::new());
    let app = TestApp::with_store(Some(store.clone())).await;
    let alice = app.user("Alice").await;
    let bob = app.user("Bob").await;
    let group = app.group(&alice, &[&bob]).await;
    let goal = app.deadline_goal(&group, 10, 48).await;
    app.solve_many(&goal, alice.id, 2).await;

    let all_time = LeaderboardQuery::default();
    let this_week = LeaderboardQuery::default().with_period(LeaderboardPeriod::Week);
    app.progress.get_group_progress(group.id, alice.id).await.unwrap();
    app.leaderboard.compute_leaderboard(group.id, &all_time, alice.id).await.unwrap();
    app.leaderboard.compute_leaderboard(group.id, &this_week, alice.id).await.unwrap();

    let progress_key = progress_cache_key(group.id);
    assert!(store.get(&progress_key).await.unwrap().is_some());
    assert!(store.get(&all_time.cache_key(group.id)).await.unwrap().is_some());
    assert!(store.get(&this_week.cache_key(group.id)).await.unwrap().is_some());

    app.clock.advance(Duration::minutes(1));
    app.solve(&goal, bob.id).await.unwrap();

    assert!(store.get(&progress_key).await.unwrap().is_none());
    assert!(store.get(&all_time.cache_key(group.id)).await.unwrap().is_none());
    assert!(store.get(&this_week.cache_key(group.id)).await.unwrap().is_none());

    let report = app.progress.get_group_progress(group.id, alice.id).await.unwrap();
    assert_eq!(report.progress.current, 3);
    let board = app
        .leaderboard
        .compute_leaderboard(group.id, &all_time, alice.id)
        .await
        .unwrap();
    assert_eq!(board.leaderboard.len(), 2);
    assert_eq!(board.leaderboard[1].user_id, bob.id);
}

#[tokio::test]
async fn test_invalidation_is_scoped_to_the_group() {
    let store = Arc::new(MokaCacheStore::new());
    let app = TestApp::with_store(Some(store.clone())).await;
    let alice = app.user("Alice").await;
    let bob = app.user("Bob").await;
    let first = app.group(&alice, &[]).await;
    let second = app.group(&bob, &[]).await;
    let first_goal = app.deadline_goal(&first, 10, 48).await;
    app.deadline_goal(&second, 10, 48).await;

    app.progress.get_group_progress(second.id, bob.id).await.unwrap();
    app.solve_many(&first_goal, alice.id, 1).await;

    assert!(store.get(&progress_cache_key(second.id)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_archival_invalidates_group_entries() {
    let store = Arc::new(MokaCacheStore::new());
    let app = TestApp::with_store(Some(store.clone())).await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;
    app.deadline_goal(&group, 10, 1).await;

    app.progress.get_group_progress(group.id, alice.id).await.unwrap();
    assert!(store.get(&progress_cache_key(group.id)).await.unwrap().is_some());

    app.clock.advance(Duration::hours(2));
    app.goals.archive_expired_goals(app.clock.now()).await.unwrap();
    assert!(store.get(&progress_cache_key(group.id)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cache_outage_falls_back_to_recompute() {
    let store = Arc::new(FailingCacheStore::default());
    let app = TestApp::with_store(Some(store.clone())).await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;
    let goal = app.deadline_goal(&group, 4, 1).await;

    app.solve_many(&goal, alice.id, 2).await;

    let report = app.progress.get_group_progress(group.id, alice.id).await.unwrap();
    assert_eq!(report.progress.current, 2);
    assert!((report.progress.percentage - 50.0).abs() < f64::EPSILON);

    let board = app
        .leaderboard
        .compute_leaderboard(group.id, &LeaderboardQuery::default(), alice.id)
        .await
        .unwrap();
    assert_eq!(board.leaderboard[0].questions_solved, 2);

    app.clock.advance(Duration::hours(2));
    assert_eq!(app.goals.archive_expired_goals(app.clock.now()).await.unwrap(), 1);

    assert!(store.call_count() > 0);
}

#[tokio::test]
async fn test_disabled_cache_always_recomputes() {
    let app = TestApp::with_store(None).await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;
    let goal = app.deadline_goal(&group, 4, 48).await;

    app.solve_many(&goal, alice.id, 1).await;
    assert_eq!(
        app.progress
            .get_group_progress(group.id, alice.id)
            .await
            .unwrap()
            .progress
            .current,
        1
    );
    app.solve_many(&goal, alice.id, 1).await;
    assert_eq!(
        app.progress
            .get_group_progress(group.id, alice.id)
            .await
            .unwrap()
            .progress
            .current,
        2
    );
}

async fn gated_app() -> (TestApp, Arc<GatedActivityRepository>) {
    let pool = create_migrated_test_pool().await.unwrap();
    let activities = Arc::new(GatedActivityRepository::new(pool.clone()));
    let app = TestApp::with_activities(pool, Some(Arc::new(MokaCacheStore::new())), activities.clone());
    (app, activities)
}

#[tokio::test]
async fn test_ranking_computed_before_a_write_is_not_cached() {
    let (app, activities) = gated_app().await;
    let alice = app.user("Alice").await;
    let bob = app.user("Bob").await;
    let group = app.group(&alice, &[&bob]).await;
    // A distant deadline gives cached rankings a month-long TTL
    let goal = app.deadline_goal(&group, 10, 24 * 30).await;
    app.solve_many(&goal, alice.id, 1).await;

    let query = LeaderboardQuery::default();
    activities.after_aggregate.arm();
    let (during, recorded) = tokio::join!(
        app.leaderboard.compute_leaderboard(group.id, &query, alice.id),
        async {
            activities.after_aggregate.reached().await;
            let recorded = app.solve(&goal, bob.id).await;
            activities.after_aggregate.release();
            recorded
        }
    );
    assert_eq!(during.unwrap().leaderboard.len(), 1);
    recorded.unwrap();

    app.clock.advance(Duration::minutes(1));
    let after = app
        .leaderboard
        .compute_leaderboard(group.id, &query, alice.id)
        .await
        .unwrap();
    assert_eq!(after.leaderboard.len(), 2);
    assert!(after.leaderboard.iter().any(|e| e.user_id == bob.id));
}

#[tokio::test]
async fn test_progress_computed_before_a_write_is_not_cached() {
    let (app, activities) = gated_app().await;
    let alice = app.user("Alice").await;
    let bob = app.user("Bob").await;
    let group = app.group(&alice, &[&bob]).await;
    let goal = app.deadline_goal(&group, 10, 24 * 30).await;
    app.solve_many(&goal, alice.id, 1).await;

    activities.after_count.arm();
    let (during, recorded) = tokio::join!(
        app.progress.get_group_progress(group.id, alice.id),
        async {
            activities.after_count.reached().await;
            let recorded = app.solve(&goal, bob.id).await;
            activities.after_count.release();
            recorded
        }
    );
    assert_eq!(during.unwrap().progress.current, 1);
    assert_eq!(recorded.unwrap().progress.unwrap().completed, 2);

    let after = app.progress.get_group_progress(group.id, alice.id).await.unwrap();
    assert_eq!(after.progress.current, 2);
}
