#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::MovementRecord;
use parkgate_core::MovementAction;
use sqlx::SqlitePool;
use tracing::debug;

/// Repository trait for the append-only movement log
pub trait MovementLogRepository: Send + Sync {
    /// Append a movement, returning its row id
    async fn record(&self, plate_number: &str, action: MovementAction) -> StorageResult<i64>;

    /// Most recent movements, newest first
    async fn recent(&self, limit: i64) -> StorageResult<Vec<MovementRecord>>;

    /// Most recent movements of one plate, newest first
    async fn find_by_plate(
        &self,
        plate_number: &str,
        limit: i64,
    ) -> StorageResult<Vec<MovementRecord>>;

    /// Number of logged movements with the given action
    async fn count_by_action(&self, action: MovementAction) -> StorageResult<i64>;
}

/// SQLite implementation of MovementLogRepository
#[derive(Debug, Clone)]
pub struct SqliteMovementLogRepository {
    pool: SqlitePool,
}

impl SqliteMovementLogRepository {
    /// Create a new SQLite movement log repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MovementLogRepository for SqliteMovementLogRepository {
    async fn record(&self, plate_number: &str, action: MovementAction) -> StorageResult<i64> {
        let result = sqlx::query("INSERT INTO movement_log (plate_number, action) VALUES (?, ?)")
            .bind(plate_number)
            .bind(action.as_str())
            .execute(&self.pool)
            .await?;

        debug!(plate = %plate_number, %action, "Movement logged");
        Ok(result.last_insert_rowid())
    }

    async fn recent(&self, limit: i64) -> StorageResult<Vec<MovementRecord>> {
        let records = sqlx::query_as::<_, MovementRecord>(
            r#"
            SELECT id, plate_number, action, timestamp
            FROM movement_log
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_by_plate(
        &self,
        plate_number: &str,
        limit: i64,
    ) -> StorageResult<Vec<MovementRecord>> {
        let records = sqlx::query_as::<_, MovementRecord>(
            r#"
            SELECT id, plate_number, action, timestamp
            FROM movement_log
            WHERE plate_number = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(plate_number)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn count_by_action(&self, action: MovementAction) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movement_log WHERE action = ?")
            .bind(action.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    async fn setup_repo() -> SqliteMovementLogRepository {
        let db = Database::in_memory().await.unwrap();
        SqliteMovementLogRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let repo = setup_repo().await;

        let id = repo.record("AB12CD", MovementAction::Entry).await.unwrap();
        let records = repo.recent(10).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].plate_number, "AB12CD");
        assert_eq!(records[0].action(), Some(MovementAction::Entry));
    }

    #[tokio::test]
    async fn test_recent_newest_first_and_limited() {
        let repo = setup_repo().await;
        for plate in ["ONE1", "TWO2", "THREE3"] {
            repo.record(plate, MovementAction::Entry).await.unwrap();
        }

        let plates: Vec<_> = repo
            .recent(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.plate_number)
            .collect();
        assert_eq!(plates, vec!["THREE3", "TWO2"]);
    }

    #[tokio::test]
    async fn test_find_by_plate() {
        let repo = setup_repo().await;
        repo.record("AB12CD", MovementAction::Entry).await.unwrap();
        repo.record("XYZ789", MovementAction::Entry).await.unwrap();
        repo.record("AB12CD", MovementAction::Exit).await.unwrap();

        let records = repo.find_by_plate("AB12CD", 10).await.unwrap();
        let actions: Vec<_> = records.iter().map(|r| r.action()).collect();
        assert_eq!(
            actions,
            vec![Some(MovementAction::Exit), Some(MovementAction::Entry)]
        );
    }

    #[tokio::test]
    async fn test_count_by_action() {
        let repo = setup_repo().await;
        repo.record("AB12CD", MovementAction::Entry).await.unwrap();
        repo.record("XYZ789", MovementAction::Entry).await.unwrap();
        repo.record("AB12CD", MovementAction::Exit).await.unwrap();

        assert_eq!(repo.count_by_action(MovementAction::Entry).await.unwrap(), 2);
        assert_eq!(repo.count_by_action(MovementAction::Exit).await.unwrap(), 1);
    }
}
