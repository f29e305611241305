//! Bounded result queue with an explicit backpressure policy.

use std::time::Duration;

use crossbeam_channel::{Receiver, SendError, SendTimeoutError, Sender, TrySendError};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::aggregation::result::CountResult;

/// What a producer does when the result queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Backpressure {
    /// Wait up to `timeout_ms` for space, then drop the new result
    Block { timeout_ms: u64 },
    /// Evict the oldest queued result to make room
    DropOldest,
}

impl Default for Backpressure {
    fn default() -> Self {
        Backpressure::Block { timeout_ms: 2000 }
    }
}

/// Producer half of the shared result queue. Cheap to clone per worker.
#[derive(Clone)]
pub struct ResultSender {
    tx: Sender<CountResult>,
    evict: Receiver<CountResult>,
    policy: Backpressure,
}

/// Create the shared result queue. A zero capacity is raised to one.
pub fn result_queue(capacity: usize, policy: Backpressure) -> (ResultSender, Receiver<CountResult>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let sender = ResultSender {
        tx,
        evict: rx.clone(),
        policy,
    };
    (sender, rx)
}

impl ResultSender {
    pub fn policy(&self) -> Backpressure {
        self.policy
    }

    /// Queue a result. Returns whether it was accepted.
    ///
    /// A task's final result is never dropped or evicted: when the queue
    /// stays full it waits for the collector to make room.
    pub fn send(&self, result: CountResult) -> bool {
        let result = match self.tx.try_send(result) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(r)) => {
                warn!("result queue closed, dropping result for {}", r.task_id);
                return false;
            }
            Err(TrySendError::Full(r)) => r,
        };

        match self.policy {
            Backpressure::Block { timeout_ms } => {
                match self.tx.send_timeout(result, Duration::from_millis(timeout_ms)) {
                    Ok(()) => true,
                    Err(SendTimeoutError::Timeout(r)) if r.is_final() => self.send_blocking(r),
                    Err(SendTimeoutError::Timeout(r)) => {
                        warn!(
                            "result queue full for {timeout_ms}ms, dropping result for {} at frame {}",
                            r.task_id, r.frame_index
                        );
                        false
                    }
                    Err(SendTimeoutError::Disconnected(r)) => {
                        warn!("result queue closed, dropping result for {}", r.task_id);
                        false
                    }
                }
            }
            Backpressure::DropOldest => self.evict_and_send(result),
        }
    }

    /// Make room by evicting the oldest non-final result.
    ///
    /// Final results met while evicting go back to the tail. After one pass
    /// over the queue without finding anything to evict, a final `result`
    /// waits for room and any other result is dropped.
    fn evict_and_send(&self, result: CountResult) -> bool {
        let mut pending = result;
        let mut rounds = self.tx.capacity().unwrap_or(1);
        loop {
            match self.evict.try_recv() {
                Ok(old) if old.is_final() => {
                    if !self.send_blocking(old) {
                        return false;
                    }
                    rounds = rounds.saturating_sub(1);
                }
                Ok(old) => {
                    warn!(
                        "result queue full, evicted result for {} at frame {}",
                        old.task_id, old.frame_index
                    );
                }
                Err(_) => {}
            }

            match self.tx.try_send(pending) {
                Ok(()) => return true,
                Err(TrySendError::Full(r)) if rounds == 0 && r.is_final() => {
                    return self.send_blocking(r);
                }
                Err(TrySendError::Full(r)) if rounds == 0 => {
                    warn!(
                        "result queue full of final results, dropping result for {} at frame {}",
                        r.task_id, r.frame_index
                    );
                    return false;
                }
                Err(TrySendError::Full(r)) => pending = r,
                Err(TrySendError::Disconnected(r)) => {
                    warn!("result queue closed, dropping result for {}", r.task_id);
                    return false;
                }
            }
        }
    }

    fn send_blocking(&self, result: CountResult) -> bool {
        match self.tx.send(result) {
            Ok(()) => true,
            Err(SendError(r)) => {
                warn!("result queue closed, dropping result for {}", r.task_id);
                false
            }
        }
    }
}
