//! Hardware abstraction layer for the parking gate controller.
//!
//! This crate covers everything the controller touches outside its own
//! process: the serial channel to the barrier firmware and the plate
//! recognition chain that identifies an arriving vehicle.
//!
//! # Serial Channel
//!
//! The [`Connector`] trait opens a fresh byte channel to the firmware.
//! [`SerialConnector`] opens a real port (8N1, no flow control) and bridges
//! the blocking handle onto an async pipe:
//!
//! ```no_run
//! use parkgate_hardware::{Connector, SerialConfig, SerialConnector};
//!
//! # async fn example() -> parkgate_hardware::Result<()> {
//! let connector = SerialConnector::new(SerialConfig::new("/dev/serial0").with_baud_rate(115_200))?;
//! let channel = connector.connect().await?;
//! # drop(channel);
//! # Ok(())
//! # }
//! ```
//!
//! # Plate Capture
//!
//! The [`PlateCapture`] trait yields the plate number of the vehicle at
//! the barrier, or `None` when no plate could be read. Two adapters ship
//! with the crate:
//!
//! - [`DetectionPipeline`](capture::DetectionPipeline) composes a
//!   [`Camera`], a [`PlateDetector`] and a [`TextReader`].
//! - [`CommandCapture`](capture::CommandCapture) runs an external
//!   recogniser and reads the plate from its standard output.
//!
//! ```no_run
//! use parkgate_hardware::PlateCapture;
//! use parkgate_hardware::capture::CommandCapture;
//!
//! # async fn example() -> parkgate_hardware::Result<()> {
//! let capture = CommandCapture::new("lpr-capture").with_args(["--camera", "0"]);
//! match capture.capture_plate().await? {
//!     Some(plate) => println!("plate {plate}"),
//!     None => println!("no plate"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides in-memory stand-ins for both seams, so the
//! link and controller crates can be tested without a device attached.

pub mod capture;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result};
pub use serial::SerialConfig;
#[cfg(feature = "serial")]
pub use serial::SerialConnector;
pub use traits::{Camera, Connector, PlateCapture, PlateDetector, TextReader};
pub use types::{BoundingBox, ImageFrame, PlateRegion, normalize_plate};
