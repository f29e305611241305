//! Latest-result-per-task aggregation and global totals.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::aggregation::result::CountResult;
use crate::orchestration::{StopSignal, TaskId, TaskStatus};

/// Latest known state of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    #[serde(flatten)]
    pub latest: CountResult,
    /// Results received for this task so far
    pub updates: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallTotals {
    pub total_in: u64,
    pub total_out: u64,
    pub net_count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub tasks_seen: usize,
    pub completed: usize,
    pub failed: usize,
    pub results_ingested: u64,
}

/// Snapshot of every task that has reported at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub generated_at: DateTime<Utc>,
    pub per_task: BTreeMap<TaskId, TaskSummary>,
    pub overall: OverallTotals,
    pub stats: ProcessingStats,
}

#[derive(Default)]
struct AggregatorState {
    latest: BTreeMap<TaskId, TaskSummary>,
    stats: ProcessingStats,
}

/// Consumes results and keeps only the most recent one per task.
#[derive(Default)]
pub struct ResultAggregator {
    state: Mutex<AggregatorState>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the task's previous result.
    pub fn ingest(&self, result: CountResult) {
        let mut state = self.lock();
        state.stats.results_ingested += 1;

        let was_final = state
            .latest
            .get(&result.task_id)
            .map(|s| s.latest.is_final());
        if was_final.is_none() {
            state.stats.tasks_seen += 1;
        }
        if was_final != Some(true) {
            match result.status {
                TaskStatus::Completed => state.stats.completed += 1,
                TaskStatus::Failed => state.stats.failed += 1,
                _ => {}
            }
        }

        if result.is_final() {
            info!(
                "task {} {}: in={} out={} current={}",
                result.task_id, result.status, result.total_in, result.total_out, result.current_count
            );
        }

        let task_id = result.task_id.clone();
        let updates = state.latest.get(&task_id).map_or(0, |s| s.updates) + 1;
        state.latest.insert(
            task_id,
            TaskSummary {
                latest: result,
                updates,
            },
        );
    }

    pub fn latest(&self, task_id: &TaskId) -> Option<CountResult> {
        self.lock().latest.get(task_id).map(|s| s.latest.clone())
    }

    /// Current snapshot. Tasks that have not reported yet are absent.
    pub fn summary(&self) -> Summary {
        let state = self.lock();
        let (total_in, total_out) = state
            .latest
            .values()
            .fold((0u64, 0u64), |(i, o), s| (i + s.latest.total_in, o + s.latest.total_out));

        Summary {
            generated_at: Utc::now(),
            per_task: state.latest.clone(),
            overall: OverallTotals {
                total_in,
                total_out,
                net_count: total_in as i64 - total_out as i64,
            },
            stats: state.stats,
        }
    }

    /// Drain `rx` until `stop` fires or every sender is gone.
    ///
    /// Each wait is bounded by `poll`. Results already queued when `stop`
    /// fires are still ingested.
    pub fn run(&self, rx: &Receiver<CountResult>, stop: &StopSignal, poll: Duration) {
        loop {
            if stop.is_triggered() {
                for result in rx.try_iter() {
                    self.ingest(result);
                }
                break;
            }
            match rx.recv_timeout(poll) {
                Ok(result) => self.ingest(result),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("result collector stopped");
    }

    /// Run the collector on its own thread.
    pub fn spawn(
        self: &Arc<Self>,
        rx: Receiver<CountResult>,
        stop: StopSignal,
        poll: Duration,
    ) -> io::Result<JoinHandle<()>> {
        let aggregator = Arc::clone(self);
        thread::Builder::new()
            .name("result-collector".into())
            .spawn(move || aggregator.run(&rx, &stop, poll))
    }
}
