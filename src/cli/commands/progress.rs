//! Progress CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::{require_user, AppContext};
use crate::cli::output::{list_table, output, percent, render_list, truncate, CommandOutput};
use crate::domain::models::{GroupProgressReport, MembersProgressReport, UserProgressReport};

#[derive(Args, Debug)]
pub struct ProgressArgs {
    #[command(subcommand)]
    pub command: ProgressCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProgressCommands {
    /// Group progress toward the active goal
    Group {
        /// Group ID
        group_id: Uuid,
    },
    /// One member's contribution to the active goal
    User {
        /// Group ID
        group_id: Uuid,
        /// Member to report on (defaults to the acting user)
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Every member's contribution to the active goal
    Members {
        /// Group ID
        group_id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct GroupProgressOutput(pub GroupProgressReport);

impl CommandOutput for GroupProgressOutput {
    fn to_human(&self) -> String {
        let report = &self.0;
        [
            format!("Goal: {}", report.goal.title),
            format!(
                "Progress: {}/{} ({})",
                report.progress.current,
                report.progress.target,
                percent(report.progress.percentage)
            ),
            format!("Remaining: {}", report.progress.remaining),
            format!("Last updated: {}", report.progress.last_updated.to_rfc3339()),
        ]
        .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct UserProgressOutput(pub UserProgressReport);

impl CommandOutput for UserProgressOutput {
    fn to_human(&self) -> String {
        let report = &self.0;
        let mut lines = vec![
            format!("{} on {}", report.user_name, report.goal.title),
            format!(
                "Solved: {} ({} of target), remaining {}",
                report.progress.questions_solved,
                percent(report.progress.contribution_percentage),
                report.progress.remaining_questions
            ),
            format!("Time spent: {}s", report.progress.total_time_spent),
        ];
        if report.progress.is_completed {
            lines.push("Target reached.".to_string());
        }

        if !report.subject_breakdown.is_empty() {
            lines.push("\nBy subject:".to_string());
            for subject in &report.subject_breakdown {
                lines.push(format!(
                    "  {}  {} solved, {}s",
                    subject.subject_id, subject.questions_solved, subject.time_spent
                ));
            }
        }

        if !report.recent_activities.is_empty() {
            lines.push("\nRecent:".to_string());
            for activity in &report.recent_activities {
                lines.push(format!(
                    "  {}  question {}",
                    activity.completed_at.format("%Y-%m-%d %H:%M"),
                    activity.question_id
                ));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct MembersProgressOutput(pub MembersProgressReport);

impl CommandOutput for MembersProgressOutput {
    fn to_human(&self) -> String {
        let report = &self.0;
        let mut table = list_table(&["member", "solved", "time", "share", "done"]);
        for member in &report.members_progress {
            table.add_row(vec![
                truncate(&member.user_name, 24),
                member.questions_solved.to_string(),
                format!("{}s", member.total_time_spent),
                percent(member.contribution_percentage),
                if member.is_completed { "yes" } else { "" }.to_string(),
            ]);
        }
        format!(
            "Goal: {}\n{}\n\nGroup progress {} with {} of {} members complete",
            report.goal.title,
            render_list("member", &table, report.summary.total_members),
            percent(report.summary.group_progress_percentage),
            report.summary.completed_members,
            report.summary.total_members
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ProgressArgs, app: &AppContext, as_user: Option<Uuid>, json_mode: bool) -> Result<()> {
    let requester = require_user(as_user)?;

    match args.command {
        ProgressCommands::Group { group_id } => {
            let report = app.progress.get_group_progress(group_id, requester).await?;
            output(&GroupProgressOutput(report), json_mode);
        }
        ProgressCommands::User { group_id, user } => {
            let report = app
                .progress
                .get_user_progress(group_id, requester, user.unwrap_or(requester))
                .await?;
            output(&UserProgressOutput(report), json_mode);
        }
        ProgressCommands::Members { group_id } => {
            let report = app.progress.get_members_progress(group_id, requester).await?;
            output(&MembersProgressOutput(report), json_mode);
        }
    }

    Ok(())
}
