use chrono::NaiveDateTime;
use parkgate_core::MovementAction;
use serde::{Deserialize, Serialize};

/// One entry or exit recorded at the gate.
///
/// Maps to the append-only `movement_log` table. The `action` column holds
/// `"entry"` or `"exit"`; use [`MovementRecord::action`] to get the typed
/// value. Rows written by other tools with an unexpected action are still
/// readable.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use parkgate_core::MovementAction;
/// use parkgate_storage::models::MovementRecord;
///
/// let record = MovementRecord {
///     id: 1,
///     plate_number: "AB12CD".to_string(),
///     action: "entry".to_string(),
///     timestamp: NaiveDate::from_ymd_opt(2025, 11, 3)
///         .unwrap()
///         .and_hms_opt(8, 15, 0)
///         .unwrap(),
/// };
///
/// assert_eq!(record.action(), Some(MovementAction::Entry));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MovementRecord {
    /// Auto-increment primary key
    pub id: i64,

    /// Plate of the vehicle that moved
    pub plate_number: String,

    /// Raw action column
    pub action: String,

    /// When the movement was logged (UTC)
    pub timestamp: NaiveDateTime,
}

impl MovementRecord {
    /// Typed action, or `None` for an unrecognised value.
    pub fn action(&self) -> Option<MovementAction> {
        self.action.parse().ok()
    }

    pub fn is_entry(&self) -> bool {
        self.action() == Some(MovementAction::Entry)
    }
}
