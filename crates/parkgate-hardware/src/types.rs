//! Common types shared by the plate capture collaborators.

use chrono::{DateTime, Utc};

/// A single still grabbed from the entry camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Encoded or raw pixel data, as produced by the camera.
    pub data: Vec<u8>,

    /// When the frame was grabbed.
    pub captured_at: DateTime<Utc>,
}

impl ImageFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Region of a frame that the detector believes holds a plate.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateRegion {
    /// Location within the source frame.
    pub bounds: BoundingBox,

    /// Detector confidence, 0.0 - 1.0.
    pub confidence: f32,

    /// Cropped image of the plate.
    pub crop: ImageFrame,
}

/// Normalise raw recogniser output into a plate number.
///
/// Plates are stored uppercase without whitespace, so `"ab 12 cd"` and
/// `"AB12CD"` denote the same vehicle. Returns `None` when nothing is left.
///
/// # Examples
///
/// ```
/// use parkgate_hardware::normalize_plate;
///
/// assert_eq!(normalize_plate(" ab 12\tcd\n").as_deref(), Some("AB12CD"));
/// assert_eq!(normalize_plate("  \n"), None);
/// ```
pub fn normalize_plate(raw: &str) -> Option<String> {
    let plate: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    (!plate.is_empty()).then_some(plate)
}
