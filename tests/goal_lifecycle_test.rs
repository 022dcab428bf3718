//! Integration tests for goal creation, supersession and archival.

mod common;

use chrono::Duration;
use common::TestApp;
use uuid::Uuid;

use studysync::domain::errors::DomainError;
use studysync::domain::models::{GoalState, NewGoal, RecurringPattern, TargetMetric};
use studysync::domain::ports::Clock;

fn goal_input(group_id: Uuid) -> NewGoal {
    NewGoal {
        group_id,
        title: "Read chapter 4".to_string(),
        description: String::new(),
        subjects: vec![Uuid::new_v4()],
        target: TargetMetric::count(10),
        deadline: None,
        recurring_pattern: None,
    }
}

#[tokio::test]
async fn test_new_goal_supersedes_active_goal() {
    let app = TestApp::new().await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;

    let first = app.deadline_goal(&group, 10, 48).await;
    let second = app.deadline_goal(&group, 20, 48).await;

    let active = app.goals.get_active_goal(group.id, alice.id).await.unwrap();
    assert_eq!(active.id, second.id);

    let superseded = app.stored_goal(first.id).await;
    assert!(!superseded.is_active);
    assert_eq!(superseded.state(), GoalState::Inactive);
    assert!(superseded.archived_at.is_none());

    let all = app.goals.list_goals(group.id, alice.id).await.unwrap();
    assert_eq!(all.iter().filter(|g| g.is_active).count(), 1);
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_deadline_and_recurrence_are_exclusive() {
    let app = TestApp::new().await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;

    let mut both = goal_input(group.id);
    both.deadline = Some(app.clock.now() + Duration::days(1));
    both.recurring_pattern = Some(RecurringPattern::daily("09:00"));
    assert!(matches!(
        app.goals.create_goal(both, alice.id).await,
        Err(DomainError::InvalidRecurrence)
    ));

    let neither = goal_input(group.id);
    assert!(matches!(
        app.goals.create_goal(neither, alice.id).await,
        Err(DomainError::InvalidRecurrence)
    ));

    assert!(matches!(
        app.goals.get_active_goal(group.id, alice.id).await,
        Err(DomainError::NoActiveGoal(_))
    ));
}

#[tokio::test]
async fn test_create_goal_rejections() {
    let app = TestApp::new().await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;

    let mut past = goal_input(group.id);
    past.deadline = Some(app.clock.now());
    assert!(matches!(
        app.goals.create_goal(past, alice.id).await,
        Err(DomainError::DeadlineInPast(_))
    ));

    let mut zero_target = goal_input(group.id);
    zero_target.deadline = Some(app.clock.now() + Duration::days(1));
    zero_target.target = TargetMetric::count(0);
    assert!(matches!(
        app.goals.create_goal(zero_target, alice.id).await,
        Err(DomainError::InvalidTarget(0))
    ));

    let mut outsider = goal_input(group.id);
    outsider.deadline = Some(app.clock.now() + Duration::days(1));
    assert!(matches!(
        app.goals.create_goal(outsider, Uuid::new_v4()).await,
        Err(DomainError::NotAMember { .. })
    ));

    let mut bad_weekly = goal_input(group.id);
    bad_weekly.recurring_pattern = Some(RecurringPattern::weekly(7));
    assert!(matches!(
        app.goals.create_goal(bad_weekly, alice.id).await,
        Err(DomainError::ValidationFailed(_))
    ));
}

#[tokio::test]
async fn test_archive_expired_goal_once() {
    let app = TestApp::new().await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;
    let goal = app.deadline_goal(&group, 10, 1).await;

    app.clock.advance(Duration::hours(1) + Duration::seconds(1));
    let now = app.clock.now();

    assert_eq!(app.goals.archive_expired_goals(now).await.unwrap(), 1);
    assert_eq!(app.goals.archive_expired_goals(now).await.unwrap(), 0);

    let archived = app.stored_goal(goal.id).await;
    assert_eq!(archived.state(), GoalState::Archived);
    assert_eq!(archived.archived_at, Some(now));
    assert!(matches!(
        app.goals.get_active_goal(group.id, alice.id).await,
        Err(DomainError::NoActiveGoal(_))
    ));
}

#[tokio::test]
async fn test_goal_at_deadline_is_not_archived() {
    let app = TestApp::new().await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;
    app.deadline_goal(&group, 10, 1).await;

    app.clock.advance(Duration::hours(1));
    assert_eq!(app.goals.archive_expired_goals(app.clock.now()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_recurring_goal_is_never_archived() {
    let app = TestApp::new().await;
    let alice = app.user("Alice").await;
    let group = app.group(&alice, &[]).await;
    let goal = app.recurring_goal(&group, 5, RecurringPattern::monthly(1)).await;

    app.clock.advance(Duration::days(400));
    assert_eq!(app.goals.archive_expired_goals(app.clock.now()).await.unwrap(), 0);
    assert!(app.stored_goal(goal.id).await.is_active);
}
