//! Maintenance CLI commands: one-off sweeps and the sweep daemon.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::services::{SchedulerEvent, SchedulerStatus, SweepReport};

#[derive(Args, Debug)]
pub struct MaintenanceArgs {
    #[command(subcommand)]
    pub command: MaintenanceCommands,
}

#[derive(Subcommand, Debug)]
pub enum MaintenanceCommands {
    /// Run a single sweep now
    RunOnce,
    /// Sweep on the configured interval until interrupted
    Daemon,
}

#[derive(Debug, serde::Serialize)]
pub struct SweepOutput {
    pub success: bool,
    pub report: SweepReport,
}

impl CommandOutput for SweepOutput {
    fn to_human(&self) -> String {
        format!(
            "Sweep complete: {} goal(s) archived, {} goal(s) reset",
            self.report.archived, self.report.reset
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct DaemonOutput {
    pub success: bool,
    pub status: SchedulerStatus,
}

impl CommandOutput for DaemonOutput {
    fn to_human(&self) -> String {
        let s = &self.status;
        format!(
            "Maintenance daemon stopped after {} sweep(s) ({} failed): {} archived, {} reset",
            s.total_runs, s.failed_runs, s.total_archived, s.total_reset
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: MaintenanceArgs, app: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        MaintenanceCommands::RunOnce => {
            let report = app.scheduler().run_once().await?;
            output(&SweepOutput { success: true, report }, json_mode);
        }

        MaintenanceCommands::Daemon => {
            if !app.config.maintenance.enabled {
                anyhow::bail!("Maintenance is disabled in configuration (maintenance.enabled = false)");
            }

            let scheduler = app.scheduler();
            let handle = scheduler.handle();
            tracing::info!(
                interval_secs = scheduler.config().interval.as_secs(),
                initial_delay_secs = scheduler.config().initial_delay.as_secs(),
                "Starting maintenance daemon"
            );
            let mut events = scheduler.spawn();

            loop {
                tokio::select! {
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for shutdown signal")?;
                        tracing::info!("Shutdown requested");
                        handle.stop();
                    }
                    event = events.recv() => match event {
                        Some(SchedulerEvent::Stopped) | None => break,
                        Some(SchedulerEvent::SweepCompleted { run_number, report, .. }) => {
                            tracing::debug!(run_number, archived = report.archived, reset = report.reset, "Sweep event");
                        }
                        Some(_) => {}
                    },
                }
            }

            let status = handle.status().await;
            output(&DaemonOutput { success: true, status }, json_mode);
        }
    }

    Ok(())
}
