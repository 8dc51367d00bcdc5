//! Errors raised by the serial channel and the plate capture chain.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The channel to `endpoint` could not be opened or was lost.
    #[error("Link to {endpoint} unavailable")]
    Disconnected { endpoint: String },

    #[error("Gave up after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Camera, detector, text reader or recogniser process failed.
    #[error("Plate capture failed: {message}")]
    Capture { message: String },

    #[error("Invalid hardware settings: {message}")]
    Configuration { message: String },

    /// The threads or task serving the serial port could not be started.
    #[error("Serial bridge failed: {0}")]
    Bridge(String),

    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn disconnected(endpoint: impl Into<String>) -> Self {
        Self::Disconnected {
            endpoint: endpoint.into(),
        }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
