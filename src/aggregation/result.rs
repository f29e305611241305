//! Point-in-time counting snapshots emitted by workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::orchestration::{TaskId, TaskStatus};
use crate::tracker::{Centroid, ObjectId};

/// One active identity as seen in a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    pub object_id: ObjectId,
    pub centroid: Centroid,
    pub counted: bool,
}

/// Counting state of one task at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountResult {
    pub task_id: TaskId,
    pub worker_id: String,
    pub timestamp: DateTime<Utc>,
    /// Frames processed so far
    pub frame_index: u64,
    /// Frames per second since the previous result; task average on the final one
    pub fps: f64,
    pub total_in: u64,
    pub total_out: u64,
    /// `total_in - total_out`, may be negative
    pub current_count: i64,
    pub status: TaskStatus,
    /// Human-readable failure message when `status` is failed
    pub error: Option<String>,
    /// Occupancy reached the task's configured threshold
    pub threshold_exceeded: bool,
    pub objects: Vec<ObjectState>,
}

impl CountResult {
    pub fn is_final(&self) -> bool {
        self.status.is_terminal()
    }
}
