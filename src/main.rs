//! StudySync CLI entry point.

use anyhow::Result;
use clap::Parser;

use studysync::cli::commands::{
    activity, goal, group, init, leaderboard, maintenance, progress, user,
};
use studysync::cli::{handle_error, AppContext, Cli, Commands};
use studysync::infrastructure::config::ConfigLoader;
use studysync::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load()?;
    let _logging = init_logging(&config.logging)?;

    let Cli { command, json, as_user } = cli;
    let app = match command {
        Commands::Init(args) => return init::execute(args, json).await,
        _ => AppContext::open(config).await?,
    };

    match command {
        // Handled before the database is opened
        Commands::Init(_) => Ok(()),
        Commands::Group(args) => group::execute(args, &app, as_user, json).await,
        Commands::User(args) => user::execute(args, &app, json).await,
        Commands::Goal(args) => goal::execute(args, &app, as_user, json).await,
        Commands::Activity(args) => activity::execute(args, &app, as_user, json).await,
        Commands::Progress(args) => progress::execute(args, &app, as_user, json).await,
        Commands::Leaderboard(args) => leaderboard::execute(args, &app, as_user, json).await,
        Commands::Maintenance(args) => maintenance::execute(args, &app, json).await,
    }
}
