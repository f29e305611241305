//! Configuration for workers, the pool and the sources to count.
//!
//! Every component receives its configuration explicitly at construction.
//! A [`CounterConfig`] can be loaded from JSON:
//!
//! ```json
//! {
//!   "parallel": { "worker_count": 2, "backpressure": { "policy": "drop_oldest" } },
//!   "tracker": { "max_disappeared": 40, "max_distance": 50.0 },
//!   "worker": { "skip_frames": 30, "confidence": 0.4 },
//!   "cameras": [{ "camera_id": "entrance", "source": "rtsp://10.0.0.5/stream", "threshold": 10 }],
//!   "videos": [{ "video_id": "lobby", "path": "videos/lobby.mp4" }]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::aggregation::Backpressure;
use crate::error::{CounterError, Result};
use crate::orchestration::{SourceType, Task, TaskConfig};
use crate::tracker::TrackerConfig;

/// Per-source pipeline settings shared by every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Run the detector every `skip_frames` frames
    pub skip_frames: u32,
    /// Detections at or below this confidence are ignored
    pub confidence: f32,
    /// Only detections with this class label are counted
    pub target_class: String,
    /// Emit a result every `result_interval` processed frames
    pub result_interval: u64,
    /// Consecutive frame failures before a task is failed
    pub max_consecutive_failures: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            skip_frames: 30,
            confidence: 0.4,
            target_class: "person".to_string(),
            result_interval: 10,
            max_consecutive_failures: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub worker_count: usize,
    pub result_queue_capacity: usize,
    pub backpressure: Backpressure,
    /// Upper bound on one blocking wait of the result collector
    pub result_poll_interval_ms: u64,
    /// Upper bound on one blocking wait of an idle worker
    pub task_poll_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            result_queue_capacity: 1024,
            backpressure: Backpressure::default(),
            result_poll_interval_ms: 1000,
            task_poll_interval_ms: 100,
        }
    }
}

impl PoolConfig {
    pub fn result_poll_interval(&self) -> Duration {
        Duration::from_millis(self.result_poll_interval_ms)
    }

    pub fn task_poll_interval(&self) -> Duration {
        Duration::from_millis(self.task_poll_interval_ms)
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEntry {
    pub camera_id: String,
    /// Device index or stream URL
    pub source: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub threshold: Option<i64>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub video_id: String,
    pub path: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub threshold: Option<i64>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub parallel: PoolConfig,
    pub tracker: TrackerConfig,
    pub worker: WorkerConfig,
    pub cameras: Vec<CameraEntry>,
    pub videos: Vec<VideoEntry>,
}

impl CounterConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallel.worker_count == 0 {
            return Err(CounterError::InvalidWorkerCount);
        }
        if self.worker.skip_frames == 0 {
            return Err(CounterError::Config("skip_frames must be at least 1".into()));
        }
        if self.worker.result_interval == 0 {
            return Err(CounterError::Config("result_interval must be at least 1".into()));
        }
        if self.worker.max_consecutive_failures == 0 {
            return Err(CounterError::Config(
                "max_consecutive_failures must be at least 1".into(),
            ));
        }
        if !self.tracker.max_distance.is_finite() || self.tracker.max_distance < 0.0 {
            return Err(CounterError::Config(format!(
                "max_distance must be a non-negative number, got {}",
                self.tracker.max_distance
            )));
        }

        let mut ids = HashSet::new();
        for camera in &self.cameras {
            if camera.camera_id.is_empty() || camera.source.is_empty() {
                return Err(CounterError::Config("camera entries need camera_id and source".into()));
            }
            if !ids.insert(format!("camera_{}", camera.camera_id)) {
                return Err(CounterError::Config(format!(
                    "duplicate camera_id `{}`",
                    camera.camera_id
                )));
            }
        }
        for video in &self.videos {
            if video.video_id.is_empty() || video.path.is_empty() {
                return Err(CounterError::Config("video entries need video_id and path".into()));
            }
            if !ids.insert(format!("video_{}", video.video_id)) {
                return Err(CounterError::Config(format!(
                    "duplicate video_id `{}`",
                    video.video_id
                )));
            }
        }
        Ok(())
    }

    /// One pending task per enabled camera and video.
    pub fn create_tasks(&self) -> Vec<Task> {
        let cameras = self.cameras.iter().filter(|c| c.enabled).map(|c| {
            Task::new(format!("camera_{}", c.camera_id), SourceType::Camera, c.source.clone())
                .with_config(TaskConfig {
                    alias: c.alias.clone(),
                    location: c.location.clone(),
                    threshold: c.threshold,
                })
        });
        let videos = self.videos.iter().filter(|v| v.enabled).map(|v| {
            Task::new(format!("video_{}", v.video_id), SourceType::File, v.path.clone())
                .with_config(TaskConfig {
                    alias: v.alias.clone(),
                    location: None,
                    threshold: v.threshold,
                })
        });
        let tasks: Vec<Task> = cameras.chain(videos).collect();
        info!("created {} tasks from configuration", tasks.len());
        tasks
    }
}
