//! Leaderboard CLI command.

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, CellAlignment};
use uuid::Uuid;

use crate::cli::context::{require_user, AppContext};
use crate::cli::output::{list_table, output, percent, truncate, CommandOutput};
use crate::domain::models::{
    Leaderboard, LeaderboardEntry, LeaderboardPeriod, LeaderboardQuery, SortBy, SortOrder,
};

#[derive(Args, Debug)]
pub struct LeaderboardArgs {
    /// Group ID
    pub group_id: Uuid,

    /// Time window (day, week, month, all)
    #[arg(short, long, default_value = "all")]
    pub period: String,

    /// Sort key (questionsSolved, contributionPercentage, totalTimeSpent, userName)
    #[arg(long, default_value = "questionsSolved")]
    pub sort_by: String,

    /// Sort order (asc, desc)
    #[arg(long, default_value = "desc")]
    pub order: String,

    /// Only count these subjects (repeatable)
    #[arg(short, long = "subject")]
    pub subjects: Vec<Uuid>,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Entries per page (1-100)
    #[arg(short, long, default_value_t = 10)]
    pub limit: u32,
}

impl LeaderboardArgs {
    fn to_query(&self) -> Result<LeaderboardQuery> {
        let period = LeaderboardPeriod::from_str(&self.period)
            .ok_or_else(|| anyhow::anyhow!("Invalid period: {}", self.period))?;
        let sort_order = SortOrder::from_str(&self.order)
            .ok_or_else(|| anyhow::anyhow!("Invalid sort order: {}", self.order))?;

        let mut query = LeaderboardQuery::default()
            .with_period(period)
            .with_sort(SortBy::parse_or_default(&self.sort_by), sort_order)
            .with_page(self.page, self.limit);
        if !self.subjects.is_empty() {
            query = query.with_subjects(self.subjects.clone());
        }
        Ok(query)
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct LeaderboardOutput(pub Leaderboard);

fn entry_row(entry: &LeaderboardEntry) -> Vec<Cell> {
    vec![
        Cell::new(entry.rank).set_alignment(CellAlignment::Right),
        Cell::new(truncate(&entry.user.name, 24)),
        Cell::new(entry.questions_solved).set_alignment(CellAlignment::Right),
        Cell::new(format!("{}s", entry.total_time_spent)).set_alignment(CellAlignment::Right),
        Cell::new(percent(entry.contribution_percentage)).set_alignment(CellAlignment::Right),
    ]
}

impl CommandOutput for LeaderboardOutput {
    fn to_human(&self) -> String {
        let board = &self.0;
        let mut lines = vec![format!(
            "{} ({}, by {} {})",
            board.goal.title, board.filters.period, board.filters.sort_by, board.filters.sort_order
        )];

        if board.leaderboard.is_empty() {
            lines.push("No contributions yet.".to_string());
        } else {
            let mut table = list_table(&["rank", "member", "solved", "time", "share"]);
            for entry in &board.leaderboard {
                table.add_row(entry_row(entry));
            }
            lines.push(table.to_string());
        }

        let page = &board.pagination;
        lines.push(format!(
            "\nPage {} of {} ({} ranked)",
            page.current_page, page.total_pages, page.total_entries
        ));

        if let Some(me) = &board.current_user {
            lines.push(format!(
                "You: #{} with {} solved ({})",
                me.rank,
                me.questions_solved,
                percent(me.contribution_percentage)
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: LeaderboardArgs, app: &AppContext, as_user: Option<Uuid>, json_mode: bool) -> Result<()> {
    let requester = require_user(as_user)?;
    let query = args.to_query()?;

    let board = app
        .leaderboard
        .compute_leaderboard(args.group_id, &query, requester)
        .await?;
    output(&LeaderboardOutput(board), json_mode);
    Ok(())
}
