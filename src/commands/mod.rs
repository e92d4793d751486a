pub mod migration;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::{
    config::config_model::DotEnvyConfig,
    infrastructure::{axum_http::http_serve, postgres::postgres_connection},
};

#[derive(Parser, Debug)]
#[command(name = "subscription-tracker", about = "Subscription tracking HTTP service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Apply or revert database migrations
    Migration(migration::MigrationArgs),
}

pub async fn handle_command(command: Commands, config: DotEnvyConfig) -> Result<()> {
    match command {
        Commands::Serve => {
            let postgres_pool = postgres_connection::establish_connection(&config.database)?;
            info!(
                max_connections = config.database.max_connections,
                min_idle = config.database.min_idle,
                "Postgres connection has been established"
            );

            http_serve::start(Arc::new(config), Arc::new(postgres_pool)).await
        }
        Commands::Migration(args) => {
            migration::handle_migration_command(args, &config.database).await
        }
    }
}
