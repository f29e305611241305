//! Worker pool: a fixed set of worker threads sharing one task queue and
//! one result queue, plus a result collector thread.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{error, info};

use crate::aggregation::{CountResult, ResultAggregator, ResultSender, Summary, result_queue};
use crate::config::{CounterConfig, PoolConfig, WorkerConfig};
use crate::error::{CounterError, Result};
use crate::integration::{Detector, SourceProvider};
use crate::orchestration::stop::StopSignal;
use crate::orchestration::task::{Task, TaskId, TaskStatus};
use crate::orchestration::task_queue::TaskQueue;
use crate::orchestration::worker::{Worker, WorkerState};
use crate::tracker::TrackerConfig;

pub struct WorkerPool {
    config: PoolConfig,
    tracker_config: TrackerConfig,
    worker_config: WorkerConfig,
    detector: Arc<dyn Detector>,
    sources: Arc<dyn SourceProvider>,
    queue: Arc<TaskQueue>,
    aggregator: Arc<ResultAggregator>,
    /// Taken on start; every worker gets a clone
    results: Option<(ResultSender, Receiver<CountResult>)>,
    worker_stop: StopSignal,
    collector_stop: StopSignal,
    states: Vec<Arc<Mutex<WorkerState>>>,
    workers: Vec<JoinHandle<()>>,
    collector: Option<JoinHandle<()>>,
    started: bool,
    stopped: bool,
}

impl WorkerPool {
    pub fn new(
        config: PoolConfig,
        tracker_config: TrackerConfig,
        worker_config: WorkerConfig,
        detector: Arc<dyn Detector>,
        sources: Arc<dyn SourceProvider>,
    ) -> Self {
        let results = result_queue(config.result_queue_capacity, config.backpressure);
        let queue = Arc::new(TaskQueue::new(config.task_poll_interval()));
        Self {
            config,
            tracker_config,
            worker_config,
            detector,
            sources,
            queue,
            aggregator: Arc::new(ResultAggregator::new()),
            results: Some(results),
            worker_stop: StopSignal::new(),
            collector_stop: StopSignal::new(),
            states: Vec::new(),
            workers: Vec::new(),
            collector: None,
            started: false,
            stopped: false,
        }
    }

    pub fn from_config(
        config: &CounterConfig,
        detector: Arc<dyn Detector>,
        sources: Arc<dyn SourceProvider>,
    ) -> Self {
        Self::new(
            config.parallel.clone(),
            config.tracker.clone(),
            config.worker.clone(),
            detector,
            sources,
        )
    }

    /// Enqueue a task. See [`TaskQueue::submit`].
    pub fn submit(&self, task: Task) -> Result<TaskId> {
        self.queue.submit(task)
    }

    /// Launch `worker_count` workers and the result collector.
    pub fn start(&mut self, worker_count: usize) -> Result<()> {
        if self.stopped {
            return Err(CounterError::PoolStopped);
        }
        if self.started {
            return Err(CounterError::PoolAlreadyStarted);
        }
        if worker_count == 0 {
            return Err(CounterError::InvalidWorkerCount);
        }
        let Some((sender, receiver)) = self.results.take() else {
            return Err(CounterError::PoolStopped);
        };
        self.started = true;

        self.collector = Some(self.aggregator.spawn(
            receiver,
            self.collector_stop.clone(),
            self.config.result_poll_interval(),
        )?);

        for i in 0..worker_count {
            let worker = Worker::new(
                format!("worker-{:02}", i + 1),
                Arc::clone(&self.detector),
                Arc::clone(&self.sources),
                self.tracker_config.clone(),
                self.worker_config.clone(),
                sender.clone(),
                self.worker_stop.clone(),
            );
            self.states.push(worker.state_handle());

            let queue = Arc::clone(&self.queue);
            let handle = thread::Builder::new()
                .name(worker.worker_id().to_string())
                .spawn(move || worker.run(&queue));
            match handle {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    error!("failed to spawn worker {}: {e}", i + 1);
                    self.stop();
                    return Err(e.into());
                }
            }
        }

        info!("started {worker_count} workers");
        Ok(())
    }

    /// Start with the configured worker count.
    pub fn start_default(&mut self) -> Result<()> {
        self.start(self.config.worker_count)
    }

    /// Signal every worker to stop at its next frame boundary, wait for them,
    /// then drain the remaining results.
    ///
    /// Tasks still pending stay in the queue.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!("stopping worker pool");

        self.worker_stop.trigger();
        self.queue.wake_all();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }

        self.collector_stop.trigger();
        if let Some(handle) = self.collector.take() {
            if handle.join().is_err() {
                error!("result collector panicked");
            }
        }
        self.results = None;

        let stats = self.aggregator.summary().stats;
        info!(
            "worker pool stopped: {} completed, {} failed",
            stats.completed, stats.failed
        );
    }

    /// Block until no task is pending or processing, up to `timeout`.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.queue.wait_idle(timeout)
    }

    pub fn task_status(&self, task_id: &TaskId) -> Option<TaskStatus> {
        self.queue.status(task_id)
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn aggregator(&self) -> Arc<ResultAggregator> {
        Arc::clone(&self.aggregator)
    }

    pub fn summary(&self) -> Summary {
        self.aggregator.summary()
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.states
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.stopped
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.started {
            self.stop();
        }
    }
}
