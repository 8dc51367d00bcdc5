//! Mock implementations for testing and development.
//!
//! This module provides simulated collaborators that can be controlled
//! programmatically without a camera or a serial device.

pub mod capture;
pub mod connector;

// Re-export commonly used types
pub use capture::MockCapture;
pub use connector::{MockConnector, MockConnectorHandle};
