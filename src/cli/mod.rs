//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use commands::{
    activity::ActivityArgs, goal::GoalArgs, group::GroupArgs, init::InitArgs,
    leaderboard::LeaderboardArgs, maintenance::MaintenanceArgs, progress::ProgressArgs,
    user::UserArgs,
};

pub use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "studysync")]
#[command(about = "StudySync - collaborative study goals, progress and leaderboards", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Acting user ID
    #[arg(long = "as", global = true, env = "STUDYSYNC_USER", value_name = "USER_ID")]
    pub as_user: Option<Uuid>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration and database
    Init(InitArgs),
    /// Study group management
    Group(GroupArgs),
    /// User directory
    User(UserArgs),
    /// Group goals
    Goal(GoalArgs),
    /// Record study activity
    Activity(ActivityArgs),
    /// Progress reports
    Progress(ProgressArgs),
    /// Ranked contributions to the active goal
    Leaderboard(LeaderboardArgs),
    /// Archive expired goals and reset recurring ones
    Maintenance(MaintenanceArgs),
}

/// Print a command failure and exit with a non-zero status.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let code = err
        .downcast_ref::<DomainError>()
        .map_or("ERROR", DomainError::code);

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "code": code,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
