//! `studysync init`: create the project state directory, default config and database.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::adapters::sqlite::{connection::database_url, initialize_database};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Wipe the existing database and rewrite the default config
    #[arg(long, short)]
    pub force: bool,

    /// Project root (defaults to the current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// Files and directories owned by a StudySync project.
struct ProjectLayout {
    root: PathBuf,
    state_dir: PathBuf,
    log_dir: PathBuf,
    config_file: PathBuf,
    database_file: PathBuf,
}

impl ProjectLayout {
    fn at(root: PathBuf) -> Self {
        let state_dir = root.join(".studysync");
        Self {
            log_dir: state_dir.join("logs"),
            config_file: state_dir.join("config.yaml"),
            database_file: state_dir.join("studysync.db"),
            state_dir,
            root,
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root).unwrap_or(path).display().to_string()
    }

    /// Remove the database together with its WAL side files.
    async fn remove_database(&self) -> Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let mut name = self.database_file.clone().into_os_string();
            name.push(suffix);
            let file = PathBuf::from(name);
            if file.exists() {
                fs::remove_file(&file)
                    .await
                    .with_context(|| format!("Failed to remove {}", file.display()))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub root: PathBuf,
    pub created: Vec<String>,
    pub config_path: Option<String>,
    pub database_path: Option<String>,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        for path in &self.created {
            lines.push(format!("  created {path}"));
        }
        if let Some(config) = &self.config_path {
            lines.push(format!("  config  {config}"));
        }
        if let Some(database) = &self.database_path {
            lines.push(format!("  db      {database}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let root = if args.path.is_absolute() {
        args.path
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(args.path)
    };
    let layout = ProjectLayout::at(root);

    if layout.database_file.exists() && !args.force {
        let result = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to start over.".to_string(),
            created: Vec::new(),
            config_path: None,
            database_path: Some(layout.relative(&layout.database_file)),
            root: layout.root,
        };
        output(&result, json_mode);
        return Ok(());
    }

    let mut created = Vec::new();
    for dir in [&layout.state_dir, &layout.log_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            created.push(layout.relative(dir));
        }
    }

    if args.force {
        layout.remove_database().await?;
    }

    let yaml = serde_yaml::to_string(&Config::default()).context("Failed to serialize default configuration")?;
    fs::write(&layout.config_file, yaml)
        .await
        .with_context(|| format!("Failed to write {}", layout.config_file.display()))?;

    let pool = initialize_database(&database_url(&layout.database_file.to_string_lossy()), None)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;
    tracing::info!(path = %layout.database_file.display(), "Initialized StudySync database");

    let result = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized with an empty database.".to_string()
        } else {
            "Project initialized.".to_string()
        },
        created,
        config_path: Some(layout.relative(&layout.config_file)),
        database_path: Some(layout.relative(&layout.database_file)),
        root: layout.root,
    };
    output(&result, json_mode);
    Ok(())
}
