use thiserror::Error;

/// Failures of the plate registry and movement log.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Plate {0} is not registered")]
    PlateNotFound(String),

    #[error("Plate {0} is already registered")]
    PlateExists(String),

    /// Rejected before reaching the database.
    #[error("Invalid plate number: {0}")]
    InvalidPlate(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
