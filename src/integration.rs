//! Integration module for connecting detectors, frame sources and box
//! trackers with the centroid tracker and counting engine.

mod builder;
mod detector;
mod pipeline;

pub use builder::BoundingBoxBuilder;
pub use detector::{BoxTracker, Detector, Frame, FrameSource, HoldBoxes, SourceProvider};
pub use pipeline::{CountingPipeline, FrameMode, FrameReport};
