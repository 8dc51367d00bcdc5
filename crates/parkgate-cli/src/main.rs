//! Parking gate controller.
//!
//! `parkgate run` (the default) talks to the barrier firmware over the
//! serial port and admits registered vehicles. The `plate` and `movements`
//! subcommands work on the same SQLite database.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use arguments::{Action, Arguments};
use config::AppConfig;

mod arguments;
mod commands;
mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();

    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(filter) = args.log_filter {
        config.logging.filter = filter;
    }
    config.validate()?;

    // RUST_LOG wins over the configured filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    match args.action.unwrap_or(Action::Run) {
        Action::Run => commands::run(config).await,
        Action::Plate { action } => commands::plate(&config, action).await,
        Action::Movements { limit } => commands::movements(&config, limit).await,
    }
}
