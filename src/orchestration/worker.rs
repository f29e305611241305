//! Worker: runs one task's full counting pipeline at a time.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::aggregation::{CountResult, ResultSender};
use crate::config::WorkerConfig;
use crate::error::FrameError;
use crate::integration::{CountingPipeline, Detector, SourceProvider};
use crate::orchestration::stop::StopSignal;
use crate::orchestration::task::{SourceType, Task, TaskId, TaskStatus};
use crate::orchestration::task_queue::TaskQueue;
use crate::tracker::TrackerConfig;

/// Observable state of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerState {
    pub worker_id: String,
    pub assigned_task: Option<TaskId>,
    pub is_alive: bool,
}

/// Frames-per-second bookkeeping for one task.
struct FpsMeter {
    started: Instant,
    interval_start: Instant,
    frames: u64,
    interval_frames: u64,
}

impl FpsMeter {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            interval_start: now,
            frames: 0,
            interval_frames: 0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        self.interval_frames += 1;
    }

    /// Rate since the previous call, then start a new interval.
    fn take_interval(&mut self) -> f64 {
        let elapsed = self.interval_start.elapsed().as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.interval_frames as f64 / elapsed
        } else {
            0.0
        };
        self.interval_start = Instant::now();
        self.interval_frames = 0;
        fps
    }

    fn average(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.frames as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Edge detector for a task's occupancy threshold.
struct OccupancyAlarm {
    threshold: Option<i64>,
    above: bool,
}

impl OccupancyAlarm {
    fn new(threshold: Option<i64>) -> Self {
        Self {
            threshold,
            above: false,
        }
    }

    /// Returns the threshold when `current` has just reached it.
    fn update(&mut self, current: i64) -> Option<i64> {
        let threshold = self.threshold?;
        let was_above = self.above;
        self.above = current >= threshold;
        (self.above && !was_above).then_some(threshold)
    }
}

pub struct Worker {
    worker_id: String,
    detector: Arc<dyn Detector>,
    sources: Arc<dyn SourceProvider>,
    tracker_config: TrackerConfig,
    config: WorkerConfig,
    results: ResultSender,
    stop: StopSignal,
    state: Arc<Mutex<WorkerState>>,
}

impl Worker {
    pub fn new(
        worker_id: impl Into<String>,
        detector: Arc<dyn Detector>,
        sources: Arc<dyn SourceProvider>,
        tracker_config: TrackerConfig,
        config: WorkerConfig,
        results: ResultSender,
        stop: StopSignal,
    ) -> Self {
        let worker_id = worker_id.into();
        let state = Arc::new(Mutex::new(WorkerState {
            worker_id: worker_id.clone(),
            assigned_task: None,
            is_alive: false,
        }));
        Self {
            worker_id,
            detector,
            sources,
            tracker_config,
            config,
            results,
            stop,
            state,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Shared handle to this worker's observable state.
    pub fn state_handle(&self) -> Arc<Mutex<WorkerState>> {
        Arc::clone(&self.state)
    }

    fn update_state(&self, f: impl FnOnce(&mut WorkerState)) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    /// Take tasks from `queue` until the stop signal fires.
    pub fn run(&self, queue: &TaskQueue) {
        self.update_state(|s| s.is_alive = true);
        info!("[{}] started", self.worker_id);

        while let Some(mut task) = queue.next(&self.stop) {
            self.run_task(&mut task);
            if let Err(e) = queue.finish(&task) {
                error!("[{}] could not finish task {}: {e}", self.worker_id, task.id);
            }
        }

        self.update_state(|s| {
            s.is_alive = false;
            s.assigned_task = None;
        });
        info!("[{}] stopped", self.worker_id);
    }

    /// Run one processing task to a terminal status.
    ///
    /// A panic inside a collaborator fails the task instead of the worker.
    /// The failed result keeps the totals counted up to the panic.
    pub fn run_task(&self, task: &mut Task) -> TaskStatus {
        self.update_state(|s| s.assigned_task = Some(task.id.clone()));
        info!(
            "[{}] task {}: starting {} ({:?} {})",
            self.worker_id,
            task.id,
            task.display_name(),
            task.source_type,
            task.source_uri
        );

        let mut pipeline = CountingPipeline::new(
            Arc::clone(&self.detector),
            self.sources.box_tracker(task),
            self.tracker_config.clone(),
            self.config.clone(),
        );
        let mut meter = FpsMeter::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.count(task, &mut pipeline, &mut meter)
        }));
        let final_result = outcome.unwrap_or_else(|_| {
            error!(
                "[{}] task {}: pipeline panicked after {} frames",
                self.worker_id,
                task.id,
                pipeline.frames_processed()
            );
            self.snapshot(
                task,
                &pipeline,
                TaskStatus::Failed,
                meter.average(),
                Some("counting pipeline panicked".to_string()),
            )
        });
        let status = final_result.status;

        if let Err(e) = task.transition(status) {
            error!("[{}] {e}", self.worker_id);
        }
        self.results.send(final_result);
        self.update_state(|s| s.assigned_task = None);
        status
    }

    /// The frame loop. Returns the task's final result.
    fn count(&self, task: &Task, pipeline: &mut CountingPipeline, meter: &mut FpsMeter) -> CountResult {
        let prefix = format!("[{}] task {}", self.worker_id, task.id);

        let mut source = match self.sources.open(task) {
            Ok(source) => source,
            Err(e) => {
                error!("{prefix}: {e}");
                return self.snapshot(task, pipeline, TaskStatus::Failed, 0.0, Some(e.to_string()));
            }
        };

        let max_failures = self.config.max_consecutive_failures.max(1);
        let interval = self.config.result_interval.max(1);
        let mut failures = 0u32;
        let mut alarm = OccupancyAlarm::new(task.config.threshold);

        let failure = loop {
            if self.stop.is_triggered() {
                info!("{prefix}: stop requested after {} frames", pipeline.frames_processed());
                break None;
            }

            let frame = match source.read() {
                Ok(Some(frame)) => Ok(frame),
                Ok(None) if task.source_type == SourceType::File => {
                    debug!("{prefix}: end of stream");
                    break None;
                }
                Ok(None) => Err(FrameError::Dropped),
                Err(e) => Err(e),
            };

            match frame.and_then(|f| pipeline.process_frame(&f)) {
                Ok(report) => {
                    failures = 0;
                    meter.tick();
                    for crossing in &report.crossings {
                        debug!(
                            "{prefix}: frame {} {:?} object {} (in={}, out={})",
                            crossing.frame_index,
                            crossing.kind,
                            crossing.object_id,
                            report.totals.total_in,
                            report.totals.total_out
                        );
                    }

                    let current = report.totals.current_count();
                    if let Some(threshold) = alarm.update(current) {
                        warn!("{prefix}: occupancy {current} reached threshold {threshold}");
                    }

                    if (report.frame_index + 1) % interval == 0 {
                        let fps = meter.take_interval();
                        self.results.send(self.snapshot(
                            task,
                            pipeline,
                            TaskStatus::Processing,
                            fps,
                            None,
                        ));
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!("{prefix}: {e} ({failures}/{max_failures} consecutive)");
                    if failures >= max_failures {
                        break Some(format!("{failures} consecutive frame failures, last: {e}"));
                    }
                }
            }
        };

        let status = match failure {
            Some(ref message) => {
                error!("{prefix}: source failed: {message}");
                TaskStatus::Failed
            }
            None => TaskStatus::Completed,
        };
        let totals = pipeline.totals();
        info!(
            "{prefix}: {status} after {} frames, in={} out={}",
            pipeline.frames_processed(),
            totals.total_in,
            totals.total_out
        );
        self.snapshot(task, pipeline, status, meter.average(), failure)
    }

    fn snapshot(
        &self,
        task: &Task,
        pipeline: &CountingPipeline,
        status: TaskStatus,
        fps: f64,
        error: Option<String>,
    ) -> CountResult {
        let totals = pipeline.totals();
        let current_count = totals.current_count();
        CountResult {
            task_id: task.id.clone(),
            worker_id: self.worker_id.clone(),
            timestamp: Utc::now(),
            frame_index: pipeline.frames_processed(),
            fps,
            total_in: totals.total_in,
            total_out: totals.total_out,
            current_count,
            status,
            error,
            threshold_exceeded: task.config.threshold.is_some_and(|t| current_count >= t),
            objects: pipeline.object_states(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{Backpressure, result_queue};
    use crate::error::Result;
    use crate::integration::{Frame, FrameSource};
    use crate::orchestration::TaskConfig;
    use crate::tracker::BoundingBox;
    use crossbeam_channel::Receiver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Frames carrying a walker's y coordinate in their first byte.
    struct Walk(Vec<u8>);

    impl FrameSource for Walk {
        fn read(&mut self) -> std::result::Result<Option<Frame>, FrameError> {
            if self.0.is_empty() {
                return Ok(None);
            }
            Ok(Some(Frame::new(vec![self.0.remove(0)], 640, 400)))
        }
    }

    struct WalkProvider(Vec<u8>);

    impl SourceProvider for WalkProvider {
        fn open(&self, _task: &Task) -> Result<Box<dyn FrameSource>> {
            Ok(Box::new(Walk(self.0.clone())))
        }
    }

    fn walker(frame: &Frame) -> std::result::Result<Vec<BoundingBox>, FrameError> {
        Ok(frame
            .data
            .first()
            .map(|&y| {
                let y = f32::from(y);
                BoundingBox::new(310.0, y - 20.0, 330.0, y + 20.0, 0.9, "person")
            })
            .into_iter()
            .collect())
    }

    fn worker(detector: Arc<dyn Detector>, ys: Vec<u8>) -> (Worker, Receiver<CountResult>) {
        let (tx, rx) = result_queue(64, Backpressure::default());
        let config = WorkerConfig {
            skip_frames: 1,
            result_interval: 2,
            max_consecutive_failures: 3,
            ..WorkerConfig::default()
        };
        let worker = Worker::new(
            "worker-01",
            detector,
            Arc::new(WalkProvider(ys)),
            TrackerConfig::default(),
            config,
            tx,
            StopSignal::new(),
        );
        (worker, rx)
    }

    fn processing(mut task: Task) -> Task {
        task.transition(TaskStatus::Processing).unwrap();
        task
    }

    #[test]
    fn test_panic_keeps_totals_and_worker() {
        // Entry on the 4th frame, detector panics on the 7th call.
        let calls = AtomicUsize::new(0);
        let detector = move |frame: &Frame| {
            if calls.fetch_add(1, Ordering::SeqCst) == 6 {
                panic!("model crashed");
            }
            walker(frame)
        };
        let (worker, rx) = worker(Arc::new(detector), vec![140, 170, 200, 230, 260, 290, 320, 350]);

        let mut task = processing(Task::file("video_a", "videos/a.mp4"));
        assert_eq!(worker.run_task(&mut task), TaskStatus::Failed);
        assert_eq!(task.status(), TaskStatus::Failed);

        let results: Vec<CountResult> = rx.try_iter().collect();
        let last = results.last().unwrap();
        assert_eq!(last.status, TaskStatus::Failed);
        assert_eq!(last.total_in, 1);
        assert_eq!(last.frame_index, 6);
        assert!(last.error.is_some());
        for pair in results.windows(2) {
            assert!(pair[1].total_in >= pair[0].total_in);
        }

        // The same worker takes the next task normally
        let mut next = processing(Task::file("video_b", "videos/b.mp4"));
        assert_eq!(worker.run_task(&mut next), TaskStatus::Completed);
        assert_eq!(rx.try_iter().last().map(|r| r.status), Some(TaskStatus::Completed));
    }

    #[test]
    fn test_threshold_flag() {
        let (worker, rx) = worker(Arc::new(walker), vec![140, 170, 200, 230, 260, 290]);
        let mut task = processing(Task::file("video_a", "videos/a.mp4").with_config(TaskConfig {
            threshold: Some(1),
            ..TaskConfig::default()
        }));
        assert_eq!(worker.run_task(&mut task), TaskStatus::Completed);

        let results: Vec<CountResult> = rx.try_iter().collect();
        // Periodic results after frames 2, 4 and 6, then the final one
        let flags: Vec<bool> = results.iter().map(|r| r.threshold_exceeded).collect();
        assert_eq!(flags, vec![false, true, true, true]);
        assert_eq!(results[3].current_count, 1);
    }

    #[test]
    fn test_occupancy_alarm_fires_once_per_rise() {
        let mut alarm = OccupancyAlarm::new(Some(2));
        let fired: Vec<Option<i64>> = [0, 2, 3, 2, 1, 2].into_iter().map(|c| alarm.update(c)).collect();
        assert_eq!(fired, vec![None, Some(2), None, None, None, Some(2)]);

        let mut unset = OccupancyAlarm::new(None);
        assert_eq!(unset.update(100), None);
    }

    #[test]
    fn test_camera_without_frames_fails() {
        let (worker, rx) = worker(Arc::new(walker), vec![]);
        let mut task = processing(Task::camera("camera_a", "rtsp://a"));
        assert_eq!(worker.run_task(&mut task), TaskStatus::Failed);

        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.frame_index, 0);
        assert!(last.error.unwrap().contains("3 consecutive frame failures"));
    }

    #[test]
    fn test_file_without_frames_completes() {
        let (worker, rx) = worker(Arc::new(walker), vec![]);
        let mut task = processing(Task::file("video_a", "videos/a.mp4"));
        assert_eq!(worker.run_task(&mut task), TaskStatus::Completed);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_final_fps_is_task_average() {
        let mut meter = FpsMeter::new();
        for _ in 0..4 {
            meter.tick();
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(meter.take_interval() > 0.0);
        meter.tick();
        meter.tick();
        assert_eq!(meter.interval_frames, 2);
        assert_eq!(meter.frames, 6);
        // Average covers all six frames, not just the last interval
        let elapsed = meter.started.elapsed().as_secs_f64();
        let average = meter.average();
        assert!(average > 0.0 && average <= 6.0 / elapsed);

        let (worker, rx) = worker(Arc::new(walker), vec![140, 170, 200]);
        let mut task = processing(Task::file("video_a", "videos/a.mp4"));
        worker.run_task(&mut task);
        let last = rx.try_iter().last().unwrap();
        assert!(last.fps > 0.0 && last.fps.is_finite());
    }
}
