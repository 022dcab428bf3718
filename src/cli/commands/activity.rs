//! Activity CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::{require_user, AppContext};
use crate::cli::output::{output, percent, CommandOutput};
use crate::domain::models::{ActivityStatus, NewActivity};
use crate::services::RecordedActivity;

#[derive(Args, Debug)]
pub struct ActivityArgs {
    #[command(subcommand)]
    pub command: ActivityCommands,
}

#[derive(Subcommand, Debug)]
pub enum ActivityCommands {
    /// Record a solved or correct question for the acting user
    Record {
        /// Group ID
        group_id: Uuid,
        /// Question ID
        #[arg(short, long)]
        question: Uuid,
        /// Subject ID
        #[arg(short, long)]
        subject: Uuid,
        /// Outcome (solved, correct)
        #[arg(long, default_value = "solved")]
        status: String,
        /// Seconds spent on the question
        #[arg(short, long, default_value_t = 0)]
        time_spent: i64,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ActivityOutput {
    pub success: bool,
    #[serde(flatten)]
    pub recorded: RecordedActivity,
    pub progress_stale: bool,
}

impl CommandOutput for ActivityOutput {
    fn to_human(&self) -> String {
        let activity = &self.recorded.activity;
        let mut lines = vec![
            "Activity recorded.".to_string(),
            format!("ID: {}", activity.id),
            format!("Goal: {}", activity.goal_id),
        ];
        match &self.recorded.progress {
            Some(progress) => lines.push(format!(
                "Goal progress: {}/{} ({})",
                progress.completed,
                progress.total,
                percent(progress.percentage)
            )),
            None => lines.push("Goal progress could not be refreshed and will catch up on the next read.".to_string()),
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ActivityArgs, app: &AppContext, as_user: Option<Uuid>, json_mode: bool) -> Result<()> {
    let user_id = require_user(as_user)?;

    match args.command {
        ActivityCommands::Record {
            group_id,
            question,
            subject,
            status,
            time_spent,
        } => {
            let status = ActivityStatus::from_str(&status)
                .ok_or_else(|| anyhow::anyhow!("Invalid status: {status}"))?;
            let recorded = app
                .ledger
                .record_activity(NewActivity {
                    group_id,
                    user_id,
                    question_id: question,
                    subject_id: subject,
                    status,
                    time_spent,
                })
                .await?;

            let out = ActivityOutput {
                success: true,
                progress_stale: recorded.progress_is_stale(),
                recorded,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
