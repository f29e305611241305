#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use peoplecount_rs::integration::{BoundingBoxBuilder, HoldBoxes};
use peoplecount_rs::{
    BoundingBox, CountTotals, CounterError, CountingPipeline, Detector, Frame, FrameError,
    FrameSource, PoolConfig, SourceProvider, Task, TrackerConfig, WorkerConfig,
};

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 400;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Detector reading one walker's y coordinate from the first byte of the frame.
pub fn walker_detector() -> Arc<dyn Detector> {
    Arc::new(|frame: &Frame| -> Result<Vec<BoundingBox>, FrameError> {
        Ok(frame
            .data
            .first()
            .map(|&y| {
                BoundingBoxBuilder::new()
                    .xywh(320.0, f32::from(y), 20.0, 40.0)
                    .confidence(0.9)
                    .build()
            })
            .into_iter()
            .collect())
    })
}

/// Walker going down across the midline.
pub fn walk_down() -> Vec<u8> {
    (60u8..=240).step_by(20).collect()
}

/// Walker going up across the midline.
pub fn walk_up() -> Vec<u8> {
    (60u8..=240).step_by(20).rev().collect()
}

#[derive(Debug, Clone)]
pub enum Script {
    /// Play the frames, then signal end of stream
    Frames(Vec<u8>),
    /// Play the frames, then fail every read
    FailAfter(Vec<u8>),
    /// Repeat one frame until stopped
    Live(u8),
}

struct ScriptedSource {
    script: Script,
    cursor: usize,
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> Result<Option<Frame>, FrameError> {
        let frame = |y: u8| Frame::new(vec![y], FRAME_WIDTH, FRAME_HEIGHT);
        match &self.script {
            Script::Frames(ys) => {
                let next = ys.get(self.cursor).map(|&y| frame(y));
                self.cursor += 1;
                Ok(next)
            }
            Script::FailAfter(ys) => {
                let next = ys.get(self.cursor).copied();
                self.cursor += 1;
                next.map(|y| Some(frame(y)))
                    .ok_or_else(|| FrameError::Read("device disconnected".into()))
            }
            Script::Live(y) => {
                thread::sleep(Duration::from_millis(2));
                Ok(Some(frame(*y)))
            }
        }
    }
}

/// Opens scripted sources by URI.
#[derive(Default)]
pub struct ScriptedSources {
    scripts: HashMap<String, Script>,
}

impl ScriptedSources {
    pub fn with(mut self, uri: &str, script: Script) -> Self {
        self.scripts.insert(uri.to_string(), script);
        self
    }
}

impl SourceProvider for ScriptedSources {
    fn open(&self, task: &Task) -> peoplecount_rs::Result<Box<dyn FrameSource>> {
        let script = self
            .scripts
            .get(&task.source_uri)
            .cloned()
            .ok_or_else(|| CounterError::SourceOpen {
                uri: task.source_uri.clone(),
                reason: "no such source".into(),
            })?;
        Ok(Box::new(ScriptedSource { script, cursor: 0 }))
    }
}

pub fn worker_config() -> WorkerConfig {
    WorkerConfig {
        skip_frames: 1,
        result_interval: 2,
        max_consecutive_failures: 3,
        ..WorkerConfig::default()
    }
}

pub fn pool_config(worker_count: usize) -> PoolConfig {
    PoolConfig {
        worker_count,
        result_poll_interval_ms: 10,
        task_poll_interval_ms: 10,
        ..PoolConfig::default()
    }
}

/// Totals from running the frames through a lone pipeline.
pub fn baseline(ys: &[u8]) -> CountTotals {
    let mut pipeline = CountingPipeline::new(
        walker_detector(),
        Box::new(HoldBoxes::default()),
        TrackerConfig::default(),
        worker_config(),
    );
    for &y in ys {
        if let Err(e) = pipeline.process_frame(&Frame::new(vec![y], FRAME_WIDTH, FRAME_HEIGHT)) {
            panic!("baseline frame failed: {e}");
        }
    }
    pipeline.totals()
}
