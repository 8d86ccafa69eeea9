//! Face bounding boxes in pixel space.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Integer box `[x1, y1, x2, y2]` as reported to clients.
pub type PixelBox = [i64; 4];

/// Axis-aligned face box in pixel coordinates, corner format.
///
/// Coordinates come straight from a face locator and may lie outside the
/// image or be inverted; nothing here validates them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge
    pub x1: f32,
    /// Top edge
    pub y1: f32,
    /// Right edge
    pub x2: f32,
    /// Bottom edge
    pub y2: f32,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width (negative for inverted boxes).
    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height (negative for inverted boxes).
    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Box area, zero for degenerate or inverted boxes.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Compute Intersection over Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Drop the fractional part of every coordinate (truncation toward zero).
    ///
    /// Non-finite coordinates become 0 and out-of-range values saturate.
    pub fn truncate(&self) -> PixelBox {
        [
            self.x1 as i64,
            self.y1 as i64,
            self.x2 as i64,
            self.y2 as i64,
        ]
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(coords: [f32; 4]) -> Self {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_drops_fraction() {
        let b = BoundingBox::new(10.9, 20.1, 110.99, 140.5);
        assert_eq!(b.truncate(), [10, 20, 110, 140]);
    }

    #[test]
    fn test_truncate_toward_zero_for_negatives() {
        let b = BoundingBox::new(-3.7, -0.2, 5.5, 6.0);
        assert_eq!(b.truncate(), [-3, 0, 5, 6]);
    }

    #[test]
    fn test_area_and_iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.area() - 100.0).abs() < 1e-6);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_inverted_box_has_zero_area() {
        let b = BoundingBox::new(10.0, 10.0, 5.0, 20.0);
        assert_eq!(b.area(), 0.0);
        assert_eq!(b.iou(&BoundingBox::new(0.0, 0.0, 20.0, 20.0)), 0.0);
    }
}
