//! Hardware trait definitions.
//!
//! This module defines the interfaces between the gate controller and the
//! things it drives or consults: the serial channel to the barrier
//! firmware and the plate recognition chain (camera, plate detector, text
//! reader).
//!
//! Methods return `impl Future + Send` rather than using bare `async fn`
//! so that implementations can be driven from spawned Tokio tasks. An
//! implementation may still be written with `async fn`.

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::types::{ImageFrame, PlateRegion};

/// Opens the byte channel to the gate firmware.
///
/// A connector is asked for a fresh channel every time the previous one
/// fails, so `connect` must be callable repeatedly. Tests inject a
/// connector handing out in-memory pipes.
///
/// # Examples
///
/// ```no_run
/// use parkgate_hardware::traits::Connector;
/// use tokio::io::AsyncWriteExt;
///
/// async fn hello<C: Connector>(connector: &C) -> parkgate_hardware::Result<()> {
///     let mut io = connector.connect().await?;
///     io.write_all(b"OK\n").await?;
///     Ok(())
/// }
/// ```
pub trait Connector: Send + Sync + 'static {
    /// Channel type produced by [`connect`](Connector::connect).
    type Io: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Human readable endpoint description for logs.
    fn describe(&self) -> String;

    /// Open the channel.
    ///
    /// # Errors
    ///
    /// Returns an error when the device cannot be opened; callers retry
    /// with backoff.
    fn connect(&self) -> impl Future<Output = Result<Self::Io>> + Send;
}

/// Produces the plate number of the vehicle at the barrier.
///
/// `Ok(None)` means no plate could be read. Errors are reserved for
/// faults in the capture chain itself; the arrival workflow treats both
/// the same way, but logs errors.
pub trait PlateCapture: Send + Sync {
    fn capture_plate(&self) -> impl Future<Output = Result<Option<String>>> + Send;
}

impl<T: PlateCapture> PlateCapture for Arc<T> {
    fn capture_plate(&self) -> impl Future<Output = Result<Option<String>>> + Send {
        (**self).capture_plate()
    }
}

/// Source of still frames.
pub trait Camera: Send + Sync {
    fn grab_frame(&self) -> impl Future<Output = Result<ImageFrame>> + Send;
}

/// Locates a licence plate in a frame.
pub trait PlateDetector: Send + Sync {
    /// Returns the best plate region, or `None` if the frame holds no plate.
    fn detect(&self, frame: &ImageFrame)
    -> impl Future<Output = Result<Option<PlateRegion>>> + Send;
}

/// Reads the characters on a cropped plate.
pub trait TextReader: Send + Sync {
    /// Returns the raw text, or `None` if nothing legible was found.
    fn read_text(&self, region: &PlateRegion)
    -> impl Future<Output = Result<Option<String>>> + Send;
}
