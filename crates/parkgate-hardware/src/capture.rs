//! Plate capture implementations.
//!
//! - [`DetectionPipeline`] chains a [`Camera`], a [`PlateDetector`] and a
//!   [`TextReader`].
//! - [`CommandCapture`] delegates to an external recogniser program that
//!   prints the plate number on stdout.

use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{HardwareError, Result};
use crate::traits::{Camera, PlateCapture, PlateDetector, TextReader};
use crate::types::normalize_plate;

/// Camera → detector → text reader chain.
///
/// Cameras often deliver a few stale or underexposed frames right after
/// they start streaming, so the pipeline can discard a configurable number
/// of warm-up frames before using one.
///
/// # Examples
///
/// ```no_run
/// use parkgate_hardware::capture::DetectionPipeline;
/// use parkgate_hardware::traits::{Camera, PlateCapture, PlateDetector, TextReader};
///
/// async fn read<C: Camera, D: PlateDetector, R: TextReader>(camera: C, detector: D, reader: R) {
///     let pipeline = DetectionPipeline::new(camera, detector, reader).with_warmup_frames(5);
///     if let Ok(Some(plate)) = pipeline.capture_plate().await {
///         println!("plate {plate}");
///     }
/// }
/// ```
#[derive(Debug)]
pub struct DetectionPipeline<C, D, R> {
    camera: C,
    detector: D,
    reader: R,
    warmup_frames: usize,
}

impl<C, D, R> DetectionPipeline<C, D, R>
where
    C: Camera,
    D: PlateDetector,
    R: TextReader,
{
    pub fn new(camera: C, detector: D, reader: R) -> Self {
        Self {
            camera,
            detector,
            reader,
            warmup_frames: 0,
        }
    }

    /// Discard `frames` frames before the one that is analysed.
    pub fn with_warmup_frames(mut self, frames: usize) -> Self {
        self.warmup_frames = frames;
        self
    }

    pub fn warmup_frames(&self) -> usize {
        self.warmup_frames
    }
}

impl<C, D, R> PlateCapture for DetectionPipeline<C, D, R>
where
    C: Camera,
    D: PlateDetector,
    R: TextReader,
{
    async fn capture_plate(&self) -> Result<Option<String>> {
        for _ in 0..self.warmup_frames {
            self.camera.grab_frame().await?;
        }

        let frame = self.camera.grab_frame().await?;
        if frame.is_empty() {
            return Err(HardwareError::capture("camera returned an empty frame"));
        }

        let Some(region) = self.detector.detect(&frame).await? else {
            debug!("No plate region detected");
            return Ok(None);
        };
        debug!(confidence = region.confidence, "Plate region detected");

        let text = self.reader.read_text(&region).await?;
        let plate = text.as_deref().and_then(normalize_plate);
        if plate.is_none() {
            debug!("Plate region contained no legible text");
        }
        Ok(plate)
    }
}

/// Runs an external recogniser and reads the plate from its output.
///
/// The first non-blank line of stdout is taken as the plate; empty output
/// means no plate was found. A non-zero exit status or a run longer than
/// the timeout is an error.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandCapture {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl PlateCapture for CommandCapture {
    async fn capture_plate(&self) -> Result<Option<String>> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| HardwareError::timeout(self.timeout.as_millis() as u64))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(program = %self.program, status = %output.status, stderr = %stderr.trim(), "Recogniser failed");
            return Err(HardwareError::capture(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().find_map(normalize_plate))
    }
}
