//! User directory CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::UserProfile;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user, or rename the user with this email
    Add {
        /// Display name
        name: String,
        /// Email address
        email: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct UserOutput {
    pub success: bool,
    pub user: UserProfile,
}

impl CommandOutput for UserOutput {
    fn to_human(&self) -> String {
        format!(
            "User registered: {} <{}>\nID: {}",
            self.user.name, self.user.email, self.user.id
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: UserArgs, app: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        UserCommands::Add { name, email } => {
            let user = app.groups.register_user(&name, &email).await?;
            output(&UserOutput { success: true, user }, json_mode);
        }
    }
    Ok(())
}
