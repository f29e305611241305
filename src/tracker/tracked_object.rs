//! Single registered identity inside a centroid tracker.

use crate::tracker::centroid::Centroid;

/// Process-local identity assigned by a [`CentroidTracker`](crate::tracker::CentroidTracker).
pub type ObjectId = u64;

/// Tracker-internal state for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedObject {
    /// Unique identifier, never reused by the owning tracker
    pub object_id: ObjectId,
    /// Most recently associated centroid
    pub centroid: Centroid,
    /// Consecutive frames without a successful match
    pub disappeared: u32,
}

impl TrackedObject {
    pub fn new(object_id: ObjectId, centroid: Centroid) -> Self {
        Self {
            object_id,
            centroid,
            disappeared: 0,
        }
    }

    /// Record a successful match.
    pub fn mark_seen(&mut self, centroid: Centroid) {
        self.centroid = centroid;
        self.disappeared = 0;
    }

    /// Record a frame without a match. Returns the new disappearance count.
    pub fn mark_missing(&mut self) -> u32 {
        self.disappeared = self.disappeared.saturating_add(1);
        self.disappeared
    }
}
