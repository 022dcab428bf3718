//! Study group CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::{require_user, AppContext};
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::StudyGroup;

#[derive(Args, Debug)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub command: GroupCommands,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// Create a study group owned by the acting user
    Create {
        /// Group name (3-50 characters)
        name: String,
        /// Group description
        #[arg(short, long)]
        description: Option<String>,
        /// Member limit (1-50, default 10)
        #[arg(short, long)]
        max_members: Option<u32>,
    },
    /// Add a member to a group (creator only)
    AddMember {
        /// Group ID
        group_id: Uuid,
        /// User ID to add
        #[arg(long, conflicts_with = "email", required_unless_present = "email")]
        user: Option<Uuid>,
        /// Email address of the user to add
        #[arg(long)]
        email: Option<String>,
    },
    /// List active groups the acting user belongs to
    List,
    /// Deactivate a group (creator only)
    Deactivate {
        /// Group ID
        group_id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOutput {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator: Uuid,
    pub member_count: usize,
    pub max_members: u32,
    pub members: Vec<Uuid>,
}

impl From<&StudyGroup> for GroupOutput {
    fn from(group: &StudyGroup) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            description: group.description.clone(),
            creator: group.creator,
            member_count: group.member_count(),
            max_members: group.max_members,
            members: group.members.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GroupListOutput {
    pub groups: Vec<GroupOutput>,
    pub total: usize,
}

impl CommandOutput for GroupListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "members", "creator"]);
        for group in &self.groups {
            table.add_row(vec![
                group.id.to_string(),
                truncate(&group.name, 30),
                format!("{}/{}", group.member_count, group.max_members),
                group.creator.to_string(),
            ]);
        }
        render_list("group", &table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GroupActionOutput {
    pub success: bool,
    pub message: String,
    pub group: Option<GroupOutput>,
}

impl CommandOutput for GroupActionOutput {
    fn to_human(&self) -> String {
        match &self.group {
            Some(group) => format!(
                "{}\nID: {}\nMembers: {}/{}",
                self.message, group.id, group.member_count, group.max_members
            ),
            None => self.message.clone(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: GroupArgs, app: &AppContext, as_user: Option<Uuid>, json_mode: bool) -> Result<()> {
    let requester = require_user(as_user)?;

    match args.command {
        GroupCommands::Create {
            name,
            description,
            max_members,
        } => {
            let group = app
                .groups
                .create_group(name, description, max_members, requester)
                .await?;
            let out = GroupActionOutput {
                success: true,
                message: format!("Group created: {}", group.name),
                group: Some(GroupOutput::from(&group)),
            };
            output(&out, json_mode);
        }

        GroupCommands::AddMember { group_id, user, email } => {
            let group = match (user, email) {
                (Some(user_id), _) => app.groups.add_member(group_id, requester, user_id).await?,
                (None, Some(email)) => {
                    app.groups
                        .add_member_by_email(group_id, requester, &email)
                        .await?
                }
                (None, None) => anyhow::bail!("Pass --user or --email"),
            };
            let out = GroupActionOutput {
                success: true,
                message: format!("Member added to {}", group.name),
                group: Some(GroupOutput::from(&group)),
            };
            output(&out, json_mode);
        }

        GroupCommands::List => {
            let groups = app.groups.list_user_groups(requester).await?;
            let out = GroupListOutput {
                total: groups.len(),
                groups: groups.iter().map(GroupOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        GroupCommands::Deactivate { group_id } => {
            app.groups.deactivate_group(group_id, requester).await?;
            let out = GroupActionOutput {
                success: true,
                message: format!("Group deactivated: {group_id}"),
                group: None,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
