//! Subcommand implementations.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use parkgate_controller::{GateService, LotState};
use parkgate_hardware::{SerialConnector, normalize_plate};
use parkgate_storage::{
    Database, DatabaseConfig, MovementLogRepository, PlateRepository, SqliteMovementLogRepository,
    SqlitePlateRepository,
};

use crate::arguments::PlateAction;
use crate::config::AppConfig;

async fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    Database::new(DatabaseConfig::new(&config.database.path))
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path))
}

fn plate_argument(raw: &str) -> anyhow::Result<String> {
    normalize_plate(raw).with_context(|| format!("'{raw}' is not a plate number"))
}

/// Run the controller until Ctrl-C or until the serial link is given up.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let db = open_database(&config).await?;
    let lot = Arc::new(LotState::with_occupied(
        config.lot.capacity,
        config.lot.initial_occupied,
    )?);
    let connector =
        SerialConnector::new(config.serial.clone()).context("Invalid serial settings")?;

    let mut handle = GateService::new(connector, config.service_config()).start(
        lot,
        config.capture(),
        SqlitePlateRepository::new(db.pool().clone()),
        SqliteMovementLogRepository::new(db.pool().clone()),
    );

    info!(
        version = parkgate_core::VERSION,
        port = %config.serial.port,
        capacity = config.lot.capacity,
        "Gate controller ready. Press Ctrl-C to exit."
    );

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
        closed = handle.closed() => closed.unwrap_or(Ok(())),
    };

    let stopped = handle.shutdown().await;
    db.close().await;

    outcome
        .and(stopped)
        .context("Gate controller stopped with an error")
}

pub async fn plate(config: &AppConfig, action: PlateAction) -> anyhow::Result<()> {
    let db = open_database(config).await?;
    let plates = SqlitePlateRepository::new(db.pool().clone());

    match action {
        PlateAction::Add { plate } => {
            let plate = plate_argument(&plate)?;
            plates.register(&plate).await?;
            println!("Registered {plate}");
        }
        PlateAction::Remove { plate } => {
            let plate = plate_argument(&plate)?;
            plates.remove(&plate).await?;
            println!("Removed {plate}");
        }
        PlateAction::List => {
            let registered = plates.list().await?;
            for plate in &registered {
                println!("{:<12} {}", plate.plate_number, plate.added_date);
            }
            println!("{} plate(s) registered", registered.len());
        }
    }

    db.close().await;
    Ok(())
}

pub async fn movements(config: &AppConfig, limit: i64) -> anyhow::Result<()> {
    let db = open_database(config).await?;
    let log = SqliteMovementLogRepository::new(db.pool().clone());

    for record in log.recent(limit).await? {
        println!(
            "{}  {:<5} {}",
            record.timestamp, record.action, record.plate_number
        );
    }

    db.close().await;
    Ok(())
}
