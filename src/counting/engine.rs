//! Directional line-crossing counter fed by tracker output.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::counting::trackable_object::TrackableObject;
use crate::tracker::{Centroid, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingKind {
    /// Moving down, below the midline
    Entry,
    /// Moving up, above the midline
    Exit,
}

/// One counted crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub object_id: ObjectId,
    pub kind: CrossingKind,
    pub centroid: Centroid,
    pub frame_index: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTotals {
    pub total_in: u64,
    pub total_out: u64,
}

impl CountTotals {
    /// Net occupancy. Not clamped: noisy tracking may drive it negative.
    pub fn current_count(&self) -> i64 {
        self.total_in as i64 - self.total_out as i64
    }
}

#[derive(Debug, Default)]
pub struct CountingEngine {
    objects: HashMap<ObjectId, TrackableObject>,
    totals: CountTotals,
    events: Vec<CrossingEvent>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self) -> CountTotals {
        self.totals
    }

    /// Every crossing counted so far, in order.
    pub fn events(&self) -> &[CrossingEvent] {
        &self.events
    }

    pub fn object(&self, object_id: ObjectId) -> Option<&TrackableObject> {
        self.objects.get(&object_id)
    }

    /// Whether the identity has already been counted. Unknown ids are uncounted.
    pub fn is_counted(&self, object_id: ObjectId) -> bool {
        self.objects.get(&object_id).is_some_and(TrackableObject::counted)
    }

    /// Run the crossing rule for every identity the tracker reported this frame.
    ///
    /// Returns the crossings counted on this frame.
    pub fn update(
        &mut self,
        objects: &BTreeMap<ObjectId, Centroid>,
        frame_height: u32,
        frame_index: u64,
    ) -> Vec<CrossingEvent> {
        let midline = i64::from(frame_height / 2);
        let mut crossings = Vec::new();

        for (&object_id, &centroid) in objects {
            let Some(to) = self.objects.get_mut(&object_id) else {
                self.objects
                    .insert(object_id, TrackableObject::new(object_id, centroid));
                continue;
            };

            let direction = to.direction(centroid);
            to.push(centroid);

            if to.counted() {
                continue;
            }

            let y = i64::from(centroid.y);
            let kind = if direction > 0.0 && y > midline {
                CrossingKind::Entry
            } else if direction < 0.0 && y < midline {
                CrossingKind::Exit
            } else {
                continue;
            };

            if !to.latch(kind) {
                continue;
            }
            match kind {
                CrossingKind::Entry => self.totals.total_in += 1,
                CrossingKind::Exit => self.totals.total_out += 1,
            }
            debug!(
                "frame {frame_index}: {kind:?} for object {object_id}, direction={direction:.2}, y={}, in={}, out={}",
                centroid.y, self.totals.total_in, self.totals.total_out
            );
            crossings.push(CrossingEvent {
                object_id,
                kind,
                centroid,
                frame_index,
                timestamp: Utc::now(),
            });
        }

        self.events.extend(crossings.iter().cloned());
        crossings
    }
}
