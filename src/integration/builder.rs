//! Builder for creating BoundingBox objects from various input formats.

use crate::tracker::BoundingBox;

/// Builder for creating `BoundingBox` objects from various input formats.
#[derive(Debug, Clone)]
pub struct BoundingBoxBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    confidence: f32,
    class_label: String,
}

impl Default for BoundingBoxBuilder {
    fn default() -> Self {
        Self {
            x1: 0.0,
            y1: 0.0,
            x2: 0.0,
            y2: 0.0,
            confidence: 0.0,
            class_label: "person".to_string(),
        }
    }
}

impl BoundingBoxBuilder {
    /// Create a new builder labelled `person`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, l: f32, t: f32, w: f32, h: f32) -> Self {
        self.x1 = l;
        self.y1 = t;
        self.x2 = l + w;
        self.y2 = t + h;
        self
    }

    /// Scale normalised coordinates (0..1) to pixel space.
    pub fn scale(mut self, width: f32, height: f32) -> Self {
        self.x1 *= width;
        self.x2 *= width;
        self.y1 *= height;
        self.y2 *= height;
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn class_label(mut self, label: impl Into<String>) -> Self {
        self.class_label = label.into();
        self
    }

    /// Build the final `BoundingBox`.
    pub fn build(self) -> BoundingBox {
        BoundingBox::new(self.x1, self.y1, self.x2, self.y2, self.confidence, self.class_label)
    }
}
