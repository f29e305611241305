//! Per-identity centroid history and counted latch.

use crate::counting::count_state::CountState;
use crate::counting::engine::CrossingKind;
use crate::tracker::{Centroid, ObjectId};

#[derive(Debug, Clone)]
pub struct TrackableObject {
    pub object_id: ObjectId,
    centroids: Vec<Centroid>,
    state: CountState,
}

impl TrackableObject {
    /// Start a history with the first associated centroid.
    pub fn new(object_id: ObjectId, centroid: Centroid) -> Self {
        Self {
            object_id,
            centroids: vec![centroid],
            state: CountState::Uncounted,
        }
    }

    /// Append-only centroid history, oldest first.
    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    pub fn state(&self) -> CountState {
        self.state
    }

    pub fn counted(&self) -> bool {
        self.state.is_counted()
    }

    /// Vertical movement of `centroid` relative to the mean of the history
    /// recorded so far. Positive means moving down the frame.
    pub fn direction(&self, centroid: Centroid) -> f64 {
        let sum: f64 = self.centroids.iter().map(|c| c.y as f64).sum();
        let mean = sum / self.centroids.len() as f64;
        centroid.y as f64 - mean
    }

    pub fn push(&mut self, centroid: Centroid) {
        self.centroids.push(centroid);
    }

    /// Latch the identity as counted. Returns false if it was already counted.
    pub(crate) fn latch(&mut self, kind: CrossingKind) -> bool {
        if self.state.is_counted() {
            return false;
        }
        self.state = match kind {
            CrossingKind::Entry => CountState::CountedEntry,
            CrossingKind::Exit => CountState::CountedExit,
        };
        true
    }
}
