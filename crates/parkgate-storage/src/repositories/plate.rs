#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::Plate;
use sqlx::SqlitePool;
use tracing::info;

/// Repository trait for the plate registry
///
/// Plate text is compared exactly; callers normalise it before lookup.
pub trait PlateRepository: Send + Sync {
    /// Whether `plate_number` is registered
    async fn is_registered(&self, plate_number: &str) -> StorageResult<bool>;

    /// Find a plate by its text
    async fn find(&self, plate_number: &str) -> StorageResult<Option<Plate>>;

    /// Register a plate, returning its row id
    async fn register(&self, plate_number: &str) -> StorageResult<i64>;

    /// Remove a registered plate
    async fn remove(&self, plate_number: &str) -> StorageResult<()>;

    /// All registered plates, newest first
    async fn list(&self) -> StorageResult<Vec<Plate>>;

    /// Number of registered plates
    async fn count(&self) -> StorageResult<i64>;
}

/// SQLite implementation of PlateRepository
#[derive(Debug, Clone)]
pub struct SqlitePlateRepository {
    pool: SqlitePool,
}

impl SqlitePlateRepository {
    /// Create a new SQLite plate repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl PlateRepository for SqlitePlateRepository {
    async fn is_registered(&self, plate_number: &str) -> StorageResult<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM plates WHERE plate_number = ?")
            .bind(plate_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn find(&self, plate_number: &str) -> StorageResult<Option<Plate>> {
        let plate = sqlx::query_as::<_, Plate>(
            r#"
            SELECT id, plate_number, added_date
            FROM plates
            WHERE plate_number = ?
            "#,
        )
        .bind(plate_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plate)
    }

    async fn register(&self, plate_number: &str) -> StorageResult<i64> {
        if plate_number.trim().is_empty() {
            return Err(StorageError::InvalidPlate("empty".to_string()));
        }

        let result = sqlx::query("INSERT INTO plates (plate_number) VALUES (?)")
            .bind(plate_number)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StorageError::PlateExists(plate_number.to_string())
                }
                other => other.into(),
            })?;

        info!(plate = %plate_number, "Plate registered");
        Ok(result.last_insert_rowid())
    }

    async fn remove(&self, plate_number: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM plates WHERE plate_number = ?")
            .bind(plate_number)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::PlateNotFound(plate_number.to_string()));
        }

        info!(plate = %plate_number, "Plate removed");
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<Plate>> {
        let plates = sqlx::query_as::<_, Plate>(
            r#"
            SELECT id, plate_number, added_date
            FROM plates
            ORDER BY added_date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plates)
    }

    async fn count(&self) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM plates")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}
