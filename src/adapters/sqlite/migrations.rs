//! Embedded schema migrations for the StudySync database.
//!
//! Migrations are compiled into the binary and applied in version order.
//! Each one runs in its own transaction together with the row that records
//! it in `schema_history`, so a crash never leaves a half-applied version.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to read schema history: {0}")]
    History(#[source] sqlx::Error),
    #[error("Failed to apply schema version {version} ({description}): {source}")]
    Apply {
        version: i64,
        description: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("Database schema version {found} is newer than the latest known version {latest}")]
    SchemaTooNew { found: i64, latest: i64 },
}

/// A schema change shipped with the binary.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Every schema version this build knows about, oldest first.
pub const SCHEMA_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "groups, goals and study activities",
    sql: include_str!("../../../migrations/001_initial_schema.sql"),
}];

pub struct SchemaMigrator<'a> {
    pool: &'a SqlitePool,
    migrations: &'a [Migration],
}

impl<'a> SchemaMigrator<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            migrations: SCHEMA_MIGRATIONS,
        }
    }

    pub fn with_migrations(mut self, migrations: &'a [Migration]) -> Self {
        self.migrations = migrations;
        self
    }

    /// Bring the schema up to date. Returns the versions applied by this call.
    pub async fn migrate(&self) -> Result<Vec<i64>, MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_history (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(self.pool)
        .await
        .map_err(MigrationError::History)?;

        let current = self.schema_version().await?;
        let latest = self.migrations.iter().map(|m| m.version).max().unwrap_or(0);
        if current > latest {
            return Err(MigrationError::SchemaTooNew { found: current, latest });
        }

        let mut applied = Vec::new();
        for migration in self.migrations.iter().filter(|m| m.version > current) {
            self.apply(migration).await?;
            info!(version = migration.version, description = migration.description, "Applied schema migration");
            applied.push(migration.version);
        }

        if applied.is_empty() {
            debug!(version = current, "Schema is up to date");
        }
        Ok(applied)
    }

    /// Highest applied version, or 0 for a fresh database.
    pub async fn schema_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_history")
            .fetch_one(self.pool)
            .await
            .map_err(MigrationError::History)?;
        Ok(version)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let failed = |source| MigrationError::Apply {
            version: migration.version,
            description: migration.description,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(failed)?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await.map_err(failed)?;
        sqlx::query("INSERT INTO schema_history (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)
    }
}
