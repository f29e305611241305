//! Error types for task scheduling, frame acquisition and export.

use crate::orchestration::{TaskId, TaskStatus};

/// Result type alias
pub type Result<T, E = CounterError> = std::result::Result<T, E>;

/// Crate-level errors.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    /// A task for the same source URI is still pending or processing
    #[error("source `{0}` already has an active task")]
    DuplicateSource(String),

    /// Task id already known to the queue
    #[error("task `{0}` was already submitted")]
    DuplicateTask(TaskId),

    /// Task status may only move pending -> processing -> completed|failed
    #[error("task `{task_id}` cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("worker pool is already running")]
    PoolAlreadyStarted,

    #[error("worker pool has been stopped")]
    PoolStopped,

    /// The frame source for a task could not be opened
    #[error("failed to open source `{uri}`: {reason}")]
    SourceOpen { uri: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Recoverable failure while acquiring or detecting on a single frame.
///
/// A worker skips the frame and retries; enough consecutive failures end the
/// task as failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame read failed: {0}")]
    Read(String),

    /// A live source returned no frame
    #[error("live source dropped a frame")]
    Dropped,

    #[error("detection failed: {0}")]
    Detection(String),
}
