//! Storage layer for the parking gate controller.
//!
//! This crate provides SQLite-backed persistence for the two tables the
//! gate shares with the web administration app:
//!
//! - `plates`: the registry of plates allowed to enter
//! - `movement_log`: an append-only record of entries and exits
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool manager with automatic migrations
//! - [`PlateRepository`], [`MovementLogRepository`] - Data access traits
//! - [`SqlitePlateRepository`], [`SqliteMovementLogRepository`] - SQLite
//!   implementations
//!
//! The migration only creates tables and indexes that are missing, so a
//! database file already populated by the admin app is used as is.
//!
//! # Example
//!
//! ```no_run
//! use parkgate_core::MovementAction;
//! use parkgate_storage::{Database, DatabaseConfig};
//! use parkgate_storage::repositories::{
//!     MovementLogRepository, PlateRepository, SqliteMovementLogRepository, SqlitePlateRepository,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("car_park.db")).await?;
//!
//! let plates = SqlitePlateRepository::new(db.pool().clone());
//! let log = SqliteMovementLogRepository::new(db.pool().clone());
//!
//! if plates.is_registered("AB12CD").await? {
//!     log.record("AB12CD", MovementAction::Entry).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! All queries use parameterized statements via SQLx.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{MovementRecord, Plate};
pub use repositories::{
    MovementLogRepository, PlateRepository, SqliteMovementLogRepository, SqlitePlateRepository,
};
