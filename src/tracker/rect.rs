use serde::{Deserialize, Serialize};

use crate::tracker::centroid::Centroid;

/// Detector output box in TLBR pixel coordinates.
///
/// Boxes are trusted as produced: no NMS or clipping happens here. Use
/// [`BoundingBox::is_well_formed`] to reject non-finite or inverted boxes
/// before they reach the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top-left x coordinate
    pub start_x: f32,
    /// Top-left y coordinate
    pub start_y: f32,
    /// Bottom-right x coordinate
    pub end_x: f32,
    /// Bottom-right y coordinate
    pub end_y: f32,
    /// Detection confidence score
    pub confidence: f32,
    /// Class label reported by the detector
    pub class_label: String,
}

impl BoundingBox {
    /// Create a new box from TLBR coordinates.
    #[inline]
    pub fn new(
        start_x: f32,
        start_y: f32,
        end_x: f32,
        end_y: f32,
        confidence: f32,
        class_label: impl Into<String>,
    ) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
            confidence,
            class_label: class_label.into(),
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.start_x, self.start_y, self.end_x, self.end_y]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.start_x, self.start_y, self.width(), self.height()]
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.end_x - self.start_x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.end_y - self.start_y
    }

    /// Integer pixel midpoint of the box, truncated toward zero.
    #[inline]
    pub fn centroid(&self) -> Centroid {
        let cx = (self.start_x + self.end_x) / 2.0;
        let cy = (self.start_y + self.end_y) / 2.0;
        Centroid::new(cx as i32, cy as i32)
    }

    /// True when every coordinate is finite and neither dimension is negative.
    pub fn is_well_formed(&self) -> bool {
        self.to_tlbr().iter().all(|v| v.is_finite()) && self.width() >= 0.0 && self.height() >= 0.0
    }
}
