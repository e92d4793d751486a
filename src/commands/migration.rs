use anyhow::{Context, Result, anyhow};
use clap::{Args, ValueEnum};
use diesel::{Connection, PgConnection};
use tracing::info;

use crate::{
    config::config_model::Database,
    infrastructure::postgres::migrations::{self, MigrationDirection},
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationAction {
    /// Apply pending migrations
    Up,
    /// Revert applied migrations
    Down,
}

impl From<MigrationAction> for MigrationDirection {
    fn from(action: MigrationAction) -> Self {
        match action {
            MigrationAction::Up => MigrationDirection::Up,
            MigrationAction::Down => MigrationDirection::Down,
        }
    }
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct MigrationArgs {
    #[arg(value_enum)]
    pub action: MigrationAction,
    /// How many migrations to apply or revert; all of them when omitted
    pub steps: Option<usize>,
}

pub async fn handle_migration_command(args: MigrationArgs, database: &Database) -> Result<()> {
    let url = database.url.clone();
    let direction = MigrationDirection::from(args.action);
    let steps = args.steps;

    // Diesel connections are blocking.
    let versions = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
        let mut connection =
            PgConnection::establish(&url).context("unable to connect to postgres")?;
        migrations::run_migrations(&mut connection, direction, steps)
    })
    .await
    .map_err(|err| anyhow!("migration task failed: {err}"))??;

    if versions.is_empty() {
        info!(action = ?args.action, "migration: no change");
    } else {
        info!(
            action = ?args.action,
            count = versions.len(),
            versions = %versions.join(","),
            "migration: completed"
        );
    }

    Ok(())
}
