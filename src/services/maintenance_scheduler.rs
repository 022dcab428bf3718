//! Maintenance background scheduler.
//!
//! Periodically sweeps goal lifecycle state:
//! - Archiving goals whose deadline elapsed
//! - Resetting recurring goals on their schedule boundary
//!
//! Sweeps run one at a time on a single task. A tick that fires while a
//! sweep is still running is skipped, never queued or overlapped. A failed
//! sweep is logged and the next tick is its retry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::domain::errors::DomainResult;
use crate::domain::models::MaintenanceConfig;
use crate::domain::ports::Clock;
use crate::services::goal_service::GoalLifecycleService;

/// Configuration for the maintenance scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between sweeps. Keep at or below one minute so daily resets
    /// matching on hour:minute are observed.
    pub interval: Duration,
    /// Delay before the first sweep.
    pub initial_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(10),
        }
    }
}

impl From<&MaintenanceConfig> for SchedulerConfig {
    fn from(config: &MaintenanceConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs.max(1)),
            initial_delay: Duration::from_secs(config.initial_delay_secs),
        }
    }
}

/// What one sweep changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub archived: u64,
    pub reset: u64,
}

/// Event emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Started,
    SweepStarted {
        run_number: u64,
    },
    SweepCompleted {
        run_number: u64,
        report: SweepReport,
        duration_ms: u64,
    },
    SweepFailed {
        run_number: u64,
        error: String,
    },
    Stopped,
}

/// Status of the scheduler.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub total_archived: u64,
    pub total_reset: u64,
}

/// Handle to control a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    stop_flag: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
    status: Arc<RwLock<SchedulerStatus>>,
}

impl SchedulerHandle {
    /// Request the scheduler to stop. A sweep in progress finishes first.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.stop_signal.notify_one();
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }
}

pub struct MaintenanceScheduler {
    lifecycle: Arc<GoalLifecycleService>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    status: Arc<RwLock<SchedulerStatus>>,
    stop_flag: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
}

impl MaintenanceScheduler {
    pub fn new(lifecycle: Arc<GoalLifecycleService>, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            lifecycle,
            clock,
            config,
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            stop_signal: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            stop_flag: self.stop_flag.clone(),
            stop_signal: self.stop_signal.clone(),
            status: self.status.clone(),
        }
    }

    /// Spawn the scheduler loop, returning a channel for its events.
    pub fn spawn(self) -> mpsc::Receiver<SchedulerEvent> {
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            self.run_loop(tx).await;
        });
        rx
    }

    async fn run_loop(self, tx: mpsc::Sender<SchedulerEvent>) {
        self.status.write().await.running = true;
        let _ = tx.send(SchedulerEvent::Started).await;
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            initial_delay_secs = self.config.initial_delay.as_secs(),
            "Maintenance scheduler started"
        );

        let stopped_early = tokio::select! {
            () = tokio::time::sleep(self.config.initial_delay) => false,
            () = self.stop_signal.notified() => true,
        };

        if !stopped_early {
            let mut timer = interval(self.config.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                if self.stop_flag.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = timer.tick() => {}
                    () = self.stop_signal.notified() => break,
                }

                if self.stop_flag.load(Ordering::Acquire) {
                    break;
                }

                self.run_sweep(&tx).await;
            }
        }

        self.status.write().await.running = false;
        let _ = tx.send(SchedulerEvent::Stopped).await;
        tracing::info!("Maintenance scheduler stopped");
    }

    async fn run_sweep(&self, tx: &mpsc::Sender<SchedulerEvent>) {
        let run_number = {
            let mut status = self.status.write().await;
            status.total_runs += 1;
            status.total_runs
        };

        let _ = tx.send(SchedulerEvent::SweepStarted { run_number }).await;

        let start = Instant::now();
        let result = self.run_once().await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(report) => {
                {
                    let mut status = self.status.write().await;
                    status.successful_runs += 1;
                    status.last_run = Some(self.clock.now());
                    status.total_archived += report.archived;
                    status.total_reset += report.reset;
                }

                if report.archived > 0 || report.reset > 0 {
                    tracing::info!(
                        run_number,
                        archived = report.archived,
                        reset = report.reset,
                        duration_ms,
                        "Maintenance sweep completed"
                    );
                } else {
                    tracing::debug!(run_number, duration_ms, "Maintenance sweep found nothing to do");
                }

                let _ = tx
                    .send(SchedulerEvent::SweepCompleted {
                        run_number,
                        report,
                        duration_ms,
                    })
                    .await;
            }
            Err(e) => {
                self.status.write().await.failed_runs += 1;
                tracing::error!(run_number, error = %e, "Maintenance sweep failed, retrying next tick");

                let _ = tx
                    .send(SchedulerEvent::SweepFailed {
                        run_number,
                        error: e.to_string(),
                    })
                    .await;
            }
        }
    }

    /// Run one sweep: archival first, then recurring resets.
    pub async fn run_once(&self) -> DomainResult<SweepReport> {
        let now = self.clock.now();
        let archived = self.lifecycle.archive_expired_goals(now).await?;
        let reset = self.lifecycle.apply_recurring_resets(now).await?;
        Ok(SweepReport { archived, reset })
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteGoalRepository, SqliteGroupRepository};
    use crate::domain::models::{NewGoal, RecurringPattern, StudyGroup, TargetMetric};
    use crate::domain::ports::{GroupRepository, ManualClock};
    use crate::services::cache_coordinator::CacheCoordinator;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use uuid::Uuid;

    async fn setup(now: DateTime<Utc>) -> (Arc<GoalLifecycleService>, Arc<ManualClock>, StudyGroup) {
        let pool = create_migrated_test_pool().await.unwrap();
        let groups = Arc::new(SqliteGroupRepository::new(pool.clone()));
        let goals = Arc::new(SqliteGoalRepository::new(pool));
        let clock = Arc::new(ManualClock::new(now));
        let group = StudyGroup::new("Night owls", Uuid::new_v4(), now);
        groups.create(&group).await.unwrap();

        let lifecycle = Arc::new(GoalLifecycleService::new(
            groups,
            goals,
            Arc::new(CacheCoordinator::disabled()),
            clock.clone(),
        ));
        (lifecycle, clock, group)
    }

    fn goal_input(group_id: Uuid, deadline: Option<DateTime<Utc>>, pattern: Option<RecurringPattern>) -> NewGoal {
        NewGoal {
            group_id,
            title: "Sweep me".to_string(),
            description: String::new(),
            subjects: vec![Uuid::new_v4()],
            target: TargetMetric::count(5),
            deadline,
            recurring_pattern: pattern,
        }
    }

    #[test]
    fn test_config_from_maintenance_config() {
        let config = SchedulerConfig::from(&MaintenanceConfig::default());
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.initial_delay, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_run_once_archives_expired_goal() {
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let (lifecycle, clock, group) = setup(start).await;
        lifecycle
            .create_goal(
                goal_input(group.id, Some(start + ChronoDuration::minutes(5)), None),
                group.creator,
            )
            .await
            .unwrap();

        let scheduler = MaintenanceScheduler::new(lifecycle, clock.clone(), SchedulerConfig::default());
        assert_eq!(scheduler.run_once().await.unwrap(), SweepReport::default());

        clock.advance(ChronoDuration::minutes(6));
        assert_eq!(scheduler.run_once().await.unwrap().archived, 1);
        assert_eq!(scheduler.run_once().await.unwrap().archived, 0);
    }

    #[tokio::test]
    async fn test_run_once_resets_recurring_goal() {
        // 2026-07-05 is a Sunday
        let start = Utc.with_ymd_and_hms(2026, 7, 4, 12, 0, 0).unwrap();
        let (lifecycle, clock, group) = setup(start).await;
        lifecycle
            .create_goal(goal_input(group.id, None, Some(RecurringPattern::weekly(0))), group.creator)
            .await
            .unwrap();

        let scheduler = MaintenanceScheduler::new(lifecycle, clock.clone(), SchedulerConfig::default());
        assert_eq!(scheduler.run_once().await.unwrap().reset, 0);

        clock.set(Utc.with_ymd_and_hms(2026, 7, 5, 0, 0, 30).unwrap());
        assert_eq!(scheduler.run_once().await.unwrap().reset, 1);
        clock.advance(ChronoDuration::hours(3));
        assert_eq!(scheduler.run_once().await.unwrap().reset, 0);
    }

    #[tokio::test]
    async fn test_loop_sweeps_and_stops() {
        let start = Utc::now();
        let (lifecycle, clock, _) = setup(start).await;
        let scheduler = MaintenanceScheduler::new(
            lifecycle,
            clock,
            SchedulerConfig {
                interval: Duration::from_millis(20),
                initial_delay: Duration::ZERO,
            },
        );
        let handle = scheduler.handle();
        let mut events = scheduler.spawn();

        assert!(matches!(events.recv().await, Some(SchedulerEvent::Started)));
        assert!(matches!(events.recv().await, Some(SchedulerEvent::SweepStarted { run_number: 1 })));
        assert!(matches!(events.recv().await, Some(SchedulerEvent::SweepCompleted { run_number: 1, .. })));

        handle.stop();
        while let Some(event) = events.recv().await {
            if matches!(event, SchedulerEvent::Stopped) {
                break;
            }
        }

        let status = handle.status().await;
        assert!(!status.running);
        assert!(status.successful_runs >= 1);
        assert_eq!(status.failed_runs, 0);
    }
}
