//! Line-crossing people counting over many concurrent video sources.
//!
//! Each source is processed by one worker at a time: detections are turned
//! into stable identities by a [`CentroidTracker`], and a [`CountingEngine`]
//! counts identities that cross the frame's horizontal midline. Workers push
//! [`CountResult`] snapshots to a shared queue that a [`ResultAggregator`]
//! folds into per-task and global totals.
//!
//! Detection models and video decoding are supplied by the caller through
//! the [`Detector`] and [`SourceProvider`] traits.

pub mod aggregation;
pub mod config;
pub mod counting;
pub mod error;
pub mod integration;
pub mod orchestration;
pub mod tracker;

pub use aggregation::{CountResult, ResultAggregator, Summary};
pub use config::{CounterConfig, PoolConfig, WorkerConfig};
pub use counting::{CountTotals, CountingEngine, CrossingEvent, CrossingKind};
pub use error::{CounterError, FrameError, Result};
pub use integration::{CountingPipeline, Detector, Frame, FrameSource, SourceProvider};
pub use orchestration::{SourceType, StopSignal, Task, TaskId, TaskStatus, WorkerPool};
pub use tracker::{BoundingBox, Centroid, CentroidTracker, TrackerConfig};
