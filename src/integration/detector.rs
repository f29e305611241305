//! Traits for the collaborators a counting pipeline consumes.

use crate::error::{FrameError, Result};
use crate::orchestration::Task;
use crate::tracker::BoundingBox;

/// One decoded video frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Raw image bytes (format depends on the source)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self { data, width, height }
    }

    /// A frame carrying only its dimensions.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(Vec::new(), width, height)
    }
}

/// Trait for object detection inference backends.
///
/// A detector is loaded once and shared read-only by every worker, so
/// inference must not require exclusive access.
///
/// # Example
///
/// ```ignore
/// use peoplecount_rs::{Detector, Frame, BoundingBox, FrameError};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl Detector for MyDetector {
///     fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, FrameError> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait Detector: Send + Sync {
    /// Run inference on a frame and return every detection, unfiltered.
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, FrameError>;
}

impl<F> Detector for F
where
    F: Fn(&Frame) -> Result<Vec<BoundingBox>, FrameError> + Send + Sync,
{
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, FrameError> {
        self(frame)
    }
}

/// Cheap per-box tracker used on frames where the detector is skipped.
pub trait BoxTracker: Send {
    /// Restart tracking from fresh detections.
    fn start(&mut self, frame: &Frame, boxes: &[BoundingBox]);

    /// Approximate the updated position of every box started last.
    fn update(&mut self, frame: &Frame) -> Vec<BoundingBox>;
}

/// Box tracker that reports the last detections unchanged.
#[derive(Debug, Clone, Default)]
pub struct HoldBoxes {
    boxes: Vec<BoundingBox>,
}

impl BoxTracker for HoldBoxes {
    fn start(&mut self, _frame: &Frame, boxes: &[BoundingBox]) {
        self.boxes = boxes.to_vec();
    }

    fn update(&mut self, _frame: &Frame) -> Vec<BoundingBox> {
        self.boxes.clone()
    }
}

/// Producer of frames for one task.
pub trait FrameSource: Send {
    /// Read the next frame.
    ///
    /// `Ok(None)` means no frame was available: end of stream for files, a
    /// transient drop for live sources.
    fn read(&mut self) -> Result<Option<Frame>, FrameError>;
}

/// Opens frame sources and box trackers for tasks.
pub trait SourceProvider: Send + Sync {
    fn open(&self, task: &Task) -> Result<Box<dyn FrameSource>>;

    fn box_tracker(&self, _task: &Task) -> Box<dyn BoxTracker> {
        Box::new(HoldBoxes::default())
    }
}
