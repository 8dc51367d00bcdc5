pub mod movement_log;
pub mod plate;

pub use movement_log::{MovementLogRepository, SqliteMovementLogRepository};
pub use plate::{PlateRepository, SqlitePlateRepository};
