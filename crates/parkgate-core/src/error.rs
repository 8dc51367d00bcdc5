use crate::types::EventId;
use thiserror::Error;

/// Structural or integrity fault in a single wire frame.
///
/// These are always recoverable: the receiver resynchronises and the
/// sender is answered with `ERR`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame too short: {len} bytes")]
    TooShort { len: usize },

    #[error("Missing start marker: found 0x{found:02X}")]
    MissingStart { found: u8 },

    #[error("Declared length {declared} does not match {actual} body bytes")]
    LengthMismatch { declared: u8, actual: usize },

    #[error("Declared length is zero")]
    ZeroLength,

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

impl FrameError {
    /// `true` for CRC failures, `false` for shape errors.
    pub fn is_checksum(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error("Payload too long: {len} bytes (max {max})")]
    PayloadTooLong { len: usize, max: usize },

    #[error("Unknown event id: 0x{0:02X}")]
    UnknownEvent(u8),

    #[error("Invalid {event} payload: {message}")]
    InvalidPayload { event: EventId, message: String },

    // Link errors
    #[error("Serial link unavailable")]
    LinkUnavailable,

    #[error("Acknowledgement timeout after {duration_ms}ms")]
    AckTimeout { duration_ms: u64 },

    #[error("Peer rejected command")]
    AckRejected,

    #[error("Unrecognized acknowledgement: {0:?}")]
    AckMismatch(String),

    // Lot accounting
    #[error("Lot is full ({capacity} spaces)")]
    LotFull { capacity: u32 },

    #[error("Lot is already empty")]
    LotEmpty,

    #[error("Occupancy {occupied} exceeds capacity {capacity}")]
    InvalidOccupancy { occupied: u32, capacity: u32 },

    // Collaborators
    #[error("Collaborator failed: {0}")]
    Collaborator(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an [`Error::InvalidPayload`] for the given event.
    pub fn invalid_payload(event: EventId, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            event,
            message: message.into(),
        }
    }

    /// Whether this error only means "the peer did not confirm the command".
    ///
    /// Such errors are logged by callers and never abort a workflow.
    pub fn is_unconfirmed_command(&self) -> bool {
        matches!(
            self,
            Self::LinkUnavailable | Self::AckTimeout { .. } | Self::AckRejected | Self::AckMismatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::ChecksumMismatch {
            expected: 0x38,
            actual: 0x01,
        };
        assert_eq!(
            err.to_string(),
            "Checksum mismatch: expected 0x38, got 0x01"
        );
        assert!(err.is_checksum());
        assert!(!FrameError::ZeroLength.is_checksum());
    }

    #[test]
    fn test_frame_error_converts_into_error() {
        let err: Error = FrameError::TooShort { len: 2 }.into();
        assert!(matches!(err, Error::Frame(FrameError::TooShort { len: 2 })));
        assert_eq!(err.to_string(), "Invalid frame: Frame too short: 2 bytes");
    }

    #[test]
    fn test_unconfirmed_command_classification() {
        assert!(Error::AckRejected.is_unconfirmed_command());
        assert!(Error::AckTimeout { duration_ms: 10 }.is_unconfirmed_command());
        assert!(Error::LinkUnavailable.is_unconfirmed_command());
        assert!(Error::AckMismatch("KO".into()).is_unconfirmed_command());
        assert!(!Error::LotEmpty.is_unconfirmed_command());
    }

    #[test]
    fn test_invalid_payload_display() {
        let err = Error::invalid_payload(EventId::Servo, "angle 200 out of range");
        assert_eq!(err.to_string(), "Invalid SERVO payload: angle 200 out of range");
    }
}
