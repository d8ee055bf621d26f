//! Normalized OCR detections.

use serde::{Deserialize, Serialize};

/// A point in image coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// One recognized text span, uniform across engines.
///
/// Produced by [`crate::engines::normalize`], which guarantees trimmed
/// non-empty text, a confidence in [0, 1] and finite coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Centroid of the region.
    pub position: Point,

    /// Recognized text, trimmed.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Region corners in engine order. Used only for drawing.
    pub region: [Point; 4],
}

impl Detection {
    /// Build a detection whose position is the mean of the region corners.
    pub fn from_region(region: [Point; 4], text: impl Into<String>, confidence: f32) -> Self {
        Self {
            position: centroid(&region),
            text: text.into(),
            confidence,
            region,
        }
    }

    /// Build a detection from an axis-aligned box.
    ///
    /// Corners are synthesized clockwise starting top-left and the position
    /// is the box center.
    pub fn from_box(
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        text: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            position: Point::new(left + width / 2.0, top + height / 2.0),
            text: text.into(),
            confidence,
            region: box_corners(left, top, width, height),
        }
    }

    /// Get the axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let min_x = self.region.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = self.region.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = self.region.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = self.region.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Mean of the four corners.
pub fn centroid(region: &[Point; 4]) -> Point {
    let x = region.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let y = region.iter().map(|p| p.y).sum::<f32>() / 4.0;
    Point::new(x, y)
}

/// Rectangle corners clockwise from top-left.
pub fn box_corners(left: f32, top: f32, width: f32, height: f32) -> [Point; 4] {
    [
        Point::new(left, top),
        Point::new(left + width, top),
        Point::new(left + width, top + height),
        Point::new(left, top + height),
    ]
}
