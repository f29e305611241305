//! CountingPipeline for combining detection, tracking and counting.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::trace;

use crate::aggregation::ObjectState;
use crate::config::WorkerConfig;
use crate::counting::{CountTotals, CountingEngine, CrossingEvent};
use crate::error::FrameError;
use crate::tracker::{BoundingBox, Centroid, CentroidTracker, ObjectId, TrackerConfig};

use super::{BoxTracker, Detector, Frame};

/// How the boxes for a frame were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// Fresh detector output
    Detecting,
    /// Box tracker approximation between detections
    Tracking,
}

/// Outcome of one processed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Zero-based index among successfully processed frames
    pub frame_index: u64,
    pub mode: FrameMode,
    pub objects: BTreeMap<ObjectId, Centroid>,
    pub crossings: Vec<CrossingEvent>,
    pub totals: CountTotals,
    /// Boxes discarded as malformed
    pub dropped_boxes: usize,
}

/// A single source's detection, tracking and counting state.
///
/// Owns its tracker and counting engine outright; only the detector is
/// shared with other pipelines.
pub struct CountingPipeline {
    detector: Arc<dyn Detector>,
    box_tracker: Box<dyn BoxTracker>,
    tracker: CentroidTracker,
    engine: CountingEngine,
    config: WorkerConfig,
    frames_processed: u64,
}

impl CountingPipeline {
    pub fn new(
        detector: Arc<dyn Detector>,
        box_tracker: Box<dyn BoxTracker>,
        tracker_config: TrackerConfig,
        config: WorkerConfig,
    ) -> Self {
        Self {
            detector,
            box_tracker,
            tracker: CentroidTracker::new(tracker_config),
            engine: CountingEngine::new(),
            config,
            frames_processed: 0,
        }
    }

    /// Process a single frame.
    ///
    /// Every `skip_frames`-th frame runs the detector and restarts the box
    /// tracker; the frames in between use the box tracker. A detection
    /// failure leaves all state untouched so the caller can skip the frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameReport, FrameError> {
        let frame_index = self.frames_processed;
        let skip = u64::from(self.config.skip_frames.max(1));

        let (mode, raw) = if frame_index % skip == 0 {
            let detections = self.detector.detect(frame)?;
            let people: Vec<BoundingBox> = detections
                .into_iter()
                .filter(|b| {
                    b.class_label == self.config.target_class
                        && b.confidence > self.config.confidence
                })
                .collect();
            self.box_tracker.start(frame, &people);
            (FrameMode::Detecting, people)
        } else {
            (FrameMode::Tracking, self.box_tracker.update(frame))
        };

        let total = raw.len();
        let boxes: Vec<BoundingBox> = raw.into_iter().filter(BoundingBox::is_well_formed).collect();
        let dropped_boxes = total - boxes.len();
        if dropped_boxes > 0 {
            trace!("frame {frame_index}: dropped {dropped_boxes} malformed boxes");
        }

        let objects = self.tracker.update(&boxes);
        let crossings = self.engine.update(&objects, frame.height, frame_index);
        self.frames_processed += 1;

        Ok(FrameReport {
            frame_index,
            mode,
            objects,
            crossings,
            totals: self.engine.totals(),
            dropped_boxes,
        })
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn totals(&self) -> CountTotals {
        self.engine.totals()
    }

    /// Active identities with their centroid and counted flag.
    pub fn object_states(&self) -> Vec<ObjectState> {
        self.tracker
            .centroids()
            .into_iter()
            .map(|(object_id, centroid)| ObjectState {
                object_id,
                centroid,
                counted: self.engine.is_counted(object_id),
            })
            .collect()
    }

    pub fn tracker(&self) -> &CentroidTracker {
        &self.tracker
    }

    pub fn engine(&self) -> &CountingEngine {
        &self.engine
    }
}
