//! Centroid tracker: frame-to-frame identity association by nearest centroid.

use std::collections::BTreeMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::tracker::centroid::Centroid;
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::rect::BoundingBox;
use crate::tracker::tracked_object::{ObjectId, TrackedObject};

/// Configuration for the CentroidTracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive unmatched frames tolerated before an identity is dropped
    pub max_disappeared: u32,
    /// Largest centroid displacement, in pixels, accepted as the same identity
    pub max_distance: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_disappeared: 40,
            max_distance: 50.0,
        }
    }
}

pub struct CentroidTracker {
    objects: BTreeMap<ObjectId, TrackedObject>,
    next_object_id: ObjectId,
    config: TrackerConfig,
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            objects: BTreeMap::new(),
            next_object_id: 0,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of identities currently registered.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, object_id: ObjectId) -> Option<&TrackedObject> {
        self.objects.get(&object_id)
    }

    /// Associate this frame's boxes with the registered identities.
    ///
    /// Returns the mapping of every active identity to its current centroid,
    /// including identities that went unmatched this frame but have not yet
    /// exceeded `max_disappeared`.
    pub fn update(&mut self, boxes: &[BoundingBox]) -> BTreeMap<ObjectId, Centroid> {
        if boxes.is_empty() {
            let ids: Vec<ObjectId> = self.objects.keys().copied().collect();
            for object_id in ids {
                self.mark_missing(object_id);
            }
            return self.centroids();
        }

        let input_centroids: Vec<Centroid> = boxes.iter().map(BoundingBox::centroid).collect();

        if self.objects.is_empty() {
            for centroid in input_centroids {
                self.register(centroid);
            }
            return self.centroids();
        }

        let object_ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        let object_centroids: Vec<Centroid> = self.objects.values().map(|o| o.centroid).collect();

        let dists = matching::centroid_distance(&object_centroids, &input_centroids);
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::greedy_assignment(&dists, self.config.max_distance);

        for (row, col) in matches {
            if let Some(object) = self.objects.get_mut(&object_ids[row]) {
                object.mark_seen(input_centroids[col]);
            }
        }

        for row in unmatched_tracks {
            self.mark_missing(object_ids[row]);
        }

        for col in unmatched_detections {
            self.register(input_centroids[col]);
        }

        self.centroids()
    }

    /// Snapshot of every active identity and its current centroid.
    pub fn centroids(&self) -> BTreeMap<ObjectId, Centroid> {
        self.objects
            .iter()
            .map(|(&id, object)| (id, object.centroid))
            .collect()
    }

    fn register(&mut self, centroid: Centroid) -> ObjectId {
        let object_id = self.next_object_id;
        self.next_object_id += 1;
        self.objects.insert(object_id, TrackedObject::new(object_id, centroid));
        trace!("registered object {object_id} at ({}, {})", centroid.x, centroid.y);
        object_id
    }

    fn deregister(&mut self, object_id: ObjectId) {
        if self.objects.remove(&object_id).is_some() {
            trace!("deregistered object {object_id}");
        }
    }

    fn mark_missing(&mut self, object_id: ObjectId) {
        let disappeared = match self.objects.get_mut(&object_id) {
            Some(object) => object.mark_missing(),
            None => return,
        };
        if disappeared > self.config.max_disappeared {
            self.deregister(object_id);
        }
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2, 0.9, "person")
    }

    #[test]
    fn test_registers_on_first_frame() {
        let mut tracker = CentroidTracker::default();
        let objects = tracker.update(&[person(0.0, 0.0, 10.0, 10.0), person(100.0, 100.0, 120.0, 120.0)]);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[&0], Centroid::new(5, 5));
        assert_eq!(objects[&1], Centroid::new(110, 110));
    }

    #[test]
    fn test_empty_update_without_objects() {
        let mut tracker = CentroidTracker::default();
        assert!(tracker.update(&[]).is_empty());
    }

    #[test]
    fn test_disappearance_resets_on_match() {
        let mut tracker = CentroidTracker::new(TrackerConfig {
            max_disappeared: 3,
            max_distance: 50.0,
        });
        tracker.update(&[person(0.0, 0.0, 10.0, 10.0)]);
        tracker.update(&[]);
        tracker.update(&[]);
        assert_eq!(tracker.get(0).map(|o| o.disappeared), Some(2));

        tracker.update(&[person(2.0, 2.0, 12.0, 12.0)]);
        assert_eq!(tracker.get(0).map(|o| o.disappeared), Some(0));
    }

    #[test]
    fn test_far_detection_registers_new_identity() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[person(0.0, 0.0, 10.0, 10.0)]);
        let objects = tracker.update(&[person(300.0, 300.0, 310.0, 310.0)]);

        // The first identity is now missing but still active.
        assert_eq!(objects.len(), 2);
        assert_eq!(tracker.get(0).map(|o| o.disappeared), Some(1));
        assert_eq!(objects[&1], Centroid::new(305, 305));
    }

    #[test]
    fn test_unmatched_rows_and_new_columns_in_same_frame() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[person(0.0, 0.0, 10.0, 10.0), person(200.0, 0.0, 210.0, 10.0)]);

        // Object 0 moves slightly, object 1 is gone, two new people appear.
        let objects = tracker.update(&[
            person(400.0, 400.0, 410.0, 410.0),
            person(3.0, 0.0, 13.0, 10.0),
            person(600.0, 400.0, 610.0, 410.0),
        ]);

        assert_eq!(objects[&0], Centroid::new(8, 5));
        assert_eq!(tracker.get(1).map(|o| o.disappeared), Some(1));
        assert_eq!(objects[&2], Centroid::new(405, 405));
        assert_eq!(objects[&3], Centroid::new(605, 405));
    }
}
