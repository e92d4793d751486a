use anyhow::Result;
use clap::Parser;
use subscription_tracker::{
    commands::{self, Cli, Commands},
    config::config_loader,
    observability,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Subscription tracker exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let _log_guard = observability::init_observability("subscription-tracker")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    commands::handle_command(cli.command.unwrap_or(Commands::Serve), dotenvy_env).await
}
