use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A registered licence plate.
///
/// Maps to the `plates` table. `added_date` is filled in by SQLite
/// (`CURRENT_TIMESTAMP`, UTC) when the row is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plate {
    /// Auto-increment primary key
    pub id: i64,

    /// Plate text as stored, unique
    pub plate_number: String,

    /// When the plate was registered
    pub added_date: NaiveDateTime,
}
