//! Goal CLI commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::{require_user, AppContext};
use crate::cli::output::{list_table, output, percent, render_list, truncate, CommandOutput};
use crate::domain::models::{
    GroupGoal, NewGoal, ProgressSnapshot, RecurrenceFrequency, RecurringPattern, TargetMetric,
    TargetMetricKind,
};

#[derive(Args, Debug)]
pub struct GoalArgs {
    #[command(subcommand)]
    pub command: GoalCommands,
}

#[derive(Subcommand, Debug)]
pub enum GoalCommands {
    /// Create the group's active goal, superseding any current one
    Create {
        /// Group ID
        group_id: Uuid,
        /// Goal title
        title: String,
        /// Goal description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Subject ID (repeatable)
        #[arg(short, long = "subject", required = true)]
        subjects: Vec<Uuid>,
        /// Target value
        #[arg(short, long)]
        target: i64,
        /// Target unit (count, percentage, time)
        #[arg(long, default_value = "count")]
        target_type: String,
        /// Deadline (RFC 3339, UTC)
        #[arg(long)]
        deadline: Option<DateTime<Utc>>,
        /// Recurrence (daily, weekly, monthly)
        #[arg(long)]
        recurring: Option<String>,
        /// Reset day: 0-6 (Sunday = 0) for weekly, 1-31 for monthly
        #[arg(long)]
        reset_day: Option<u32>,
        /// Reset time HH:MM for daily goals
        #[arg(long)]
        reset_time: Option<String>,
    },
    /// Show the group's active goal
    Active {
        /// Group ID
        group_id: Uuid,
    },
    /// List every goal of the group, newest first
    List {
        /// Group ID
        group_id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalOutput {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub description: String,
    pub state: String,
    pub target: TargetMetric,
    pub deadline: Option<DateTime<Utc>>,
    pub recurring_pattern: Option<RecurringPattern>,
    pub subjects: Vec<Uuid>,
    pub progress: ProgressSnapshot,
}

impl From<&GroupGoal> for GoalOutput {
    fn from(goal: &GroupGoal) -> Self {
        Self {
            id: goal.id,
            group_id: goal.group_id,
            title: goal.title.clone(),
            description: goal.description.clone(),
            state: goal.state().as_str().to_string(),
            target: goal.target,
            deadline: goal.deadline(),
            recurring_pattern: goal.recurring_pattern().cloned(),
            subjects: goal.subjects.clone(),
            progress: goal.progress.clone(),
        }
    }
}

impl GoalOutput {
    fn schedule_label(&self) -> String {
        match (&self.deadline, &self.recurring_pattern) {
            (Some(deadline), _) => format!("due {}", deadline.format("%Y-%m-%d %H:%M UTC")),
            (None, Some(pattern)) => format!("recurring {}", pattern.frequency),
            (None, None) => "-".to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GoalDetailOutput {
    pub success: bool,
    pub message: Option<String>,
    pub goal: GoalOutput,
}

impl CommandOutput for GoalDetailOutput {
    fn to_human(&self) -> String {
        let goal = &self.goal;
        let mut lines = Vec::new();
        if let Some(message) = &self.message {
            lines.push(message.clone());
        }
        lines.extend([
            format!("Goal: {}", goal.title),
            format!("ID: {}", goal.id),
            format!("State: {}", goal.state),
            format!("Target: {} ({})", goal.target.value, goal.target.kind.as_str()),
            format!("Schedule: {}", goal.schedule_label()),
            format!(
                "Progress: {}/{} ({})",
                goal.progress.completed,
                goal.progress.total,
                percent(goal.progress.percentage)
            ),
        ]);
        if !goal.description.is_empty() {
            lines.push(format!("Description: {}", goal.description));
        }
        lines.push(format!("Subjects: {}", goal.subjects.len()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GoalListOutput {
    pub goals: Vec<GoalOutput>,
    pub total: usize,
}

impl CommandOutput for GoalListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "title", "state", "progress", "schedule"]);
        for goal in &self.goals {
            table.add_row(vec![
                goal.id.to_string(),
                truncate(&goal.title, 30),
                goal.state.clone(),
                format!("{}/{}", goal.progress.completed, goal.progress.total),
                goal.schedule_label(),
            ]);
        }
        render_list("goal", &table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn parse_recurrence(
    recurring: Option<String>,
    reset_day: Option<u32>,
    reset_time: Option<String>,
) -> Result<Option<RecurringPattern>> {
    let Some(frequency) = recurring else {
        return Ok(None);
    };
    let frequency = RecurrenceFrequency::from_str(&frequency)
        .ok_or_else(|| anyhow::anyhow!("Invalid recurrence: {frequency}"))?;
    Ok(Some(RecurringPattern {
        frequency,
        reset_day,
        reset_time,
    }))
}

pub async fn execute(args: GoalArgs, app: &AppContext, as_user: Option<Uuid>, json_mode: bool) -> Result<()> {
    let requester = require_user(as_user)?;

    match args.command {
        GoalCommands::Create {
            group_id,
            title,
            description,
            subjects,
            target,
            target_type,
            deadline,
            recurring,
            reset_day,
            reset_time,
        } => {
            let kind = TargetMetricKind::from_str(&target_type)
                .ok_or_else(|| anyhow::anyhow!("Invalid target type: {target_type}"))?;
            let input = NewGoal {
                group_id,
                title,
                description,
                subjects,
                target: TargetMetric { kind, value: target },
                deadline,
                recurring_pattern: parse_recurrence(recurring, reset_day, reset_time)?,
            };

            let goal = app.goals.create_goal(input, requester).await?;
            let out = GoalDetailOutput {
                success: true,
                message: Some("Goal created.".to_string()),
                goal: GoalOutput::from(&goal),
            };
            output(&out, json_mode);
        }

        GoalCommands::Active { group_id } => {
            let goal = app.goals.get_active_goal(group_id, requester).await?;
            let out = GoalDetailOutput {
                success: true,
                message: None,
                goal: GoalOutput::from(&goal),
            };
            output(&out, json_mode);
        }

        GoalCommands::List { group_id } => {
            let goals = app.goals.list_goals(group_id, requester).await?;
            let out = GoalListOutput {
                total: goals.len(),
                goals: goals.iter().map(GoalOutput::from).collect(),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
