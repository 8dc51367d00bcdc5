pub mod movement;
pub mod plate;

pub use movement::MovementRecord;
pub use plate::Plate;
