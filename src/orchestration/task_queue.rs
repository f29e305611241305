//! Priority task queue enforcing one active task per source.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::{CounterError, Result};
use crate::orchestration::stop::StopSignal;
use crate::orchestration::task::{Task, TaskId, TaskStatus};

struct Queued {
    priority: u8,
    seq: u64,
    task: Task,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // BinaryHeap is a max-heap: invert so the lowest priority number, then
    // the earliest submission, comes out first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct QueueState {
    pending: BinaryHeap<Queued>,
    statuses: HashMap<TaskId, TaskStatus>,
    active_sources: HashMap<String, TaskId>,
    processing: usize,
    next_seq: u64,
}

pub struct TaskQueue {
    state: Mutex<QueueState>,
    changed: Condvar,
    poll_interval: Duration,
}

impl TaskQueue {
    /// `poll_interval` bounds how long a blocked dequeue goes without
    /// re-checking the stop signal.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            changed: Condvar::new(),
            poll_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a pending task.
    ///
    /// Rejected when another task for the same source URI is still pending or
    /// processing, or when the task id has been seen before.
    pub fn submit(&self, task: Task) -> Result<TaskId> {
        if task.status() != TaskStatus::Pending {
            return Err(CounterError::InvalidTransition {
                task_id: task.id.clone(),
                from: task.status(),
                to: TaskStatus::Pending,
            });
        }

        let mut state = self.lock();
        if state.active_sources.contains_key(&task.source_uri) {
            warn!(
                "source `{}` already has an active task, rejecting {}",
                task.source_uri, task.id
            );
            return Err(CounterError::DuplicateSource(task.source_uri));
        }
        if state.statuses.contains_key(&task.id) {
            return Err(CounterError::DuplicateTask(task.id));
        }

        let task_id = task.id.clone();
        state
            .active_sources
            .insert(task.source_uri.clone(), task_id.clone());
        state.statuses.insert(task_id.clone(), TaskStatus::Pending);
        let seq = state.next_seq;
        state.next_seq += 1;
        info!("queued task {} ({}) priority {}", task_id, task.display_name(), task.priority);
        state.pending.push(Queued {
            priority: task.priority,
            seq,
            task,
        });
        drop(state);

        self.changed.notify_all();
        Ok(task_id)
    }

    /// Block until a task is available or `stop` fires.
    ///
    /// The returned task has already moved to `processing`.
    pub fn next(&self, stop: &StopSignal) -> Option<Task> {
        let mut state = self.lock();
        loop {
            if stop.is_triggered() {
                return None;
            }
            if let Some(Queued { mut task, .. }) = state.pending.pop() {
                if let Err(e) = task.transition(TaskStatus::Processing) {
                    warn!("skipping task {}: {e}", task.id);
                    continue;
                }
                state.statuses.insert(task.id.clone(), TaskStatus::Processing);
                state.processing += 1;
                drop(state);
                self.changed.notify_all();
                return Some(task);
            }
            state = self
                .changed
                .wait_timeout(state, self.poll_interval)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Record a task's terminal status and release its source URI.
    pub fn finish(&self, task: &Task) -> Result<()> {
        let mut state = self.lock();
        let current = state.statuses.get(&task.id).copied();
        if current != Some(TaskStatus::Processing) || !task.status().is_terminal() {
            return Err(CounterError::InvalidTransition {
                task_id: task.id.clone(),
                from: current.unwrap_or_default(),
                to: task.status(),
            });
        }

        state.statuses.insert(task.id.clone(), task.status());
        if state.active_sources.get(&task.source_uri) == Some(&task.id) {
            state.active_sources.remove(&task.source_uri);
        }
        state.processing = state.processing.saturating_sub(1);
        drop(state);

        self.changed.notify_all();
        Ok(())
    }

    pub fn status(&self, task_id: &TaskId) -> Option<TaskStatus> {
        self.lock().statuses.get(task_id).copied()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn processing_len(&self) -> usize {
        self.lock().processing
    }

    /// No task is pending or processing.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.processing == 0
    }

    /// Block until the queue is idle or `timeout` elapses. Returns whether it
    /// became idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.pending.is_empty() && state.processing == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let wait = (deadline - now).min(self.poll_interval);
            state = self
                .changed
                .wait_timeout(state, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Wake every blocked caller so it re-checks its condition.
    pub fn wake_all(&self) {
        self.changed.notify_all();
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
