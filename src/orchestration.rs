//! Task scheduling: the task queue, workers and the worker pool.

mod pool;
mod stop;
mod task;
mod task_queue;
mod worker;

pub use pool::WorkerPool;
pub use stop::StopSignal;
pub use task::{SourceType, Task, TaskConfig, TaskId, TaskStatus};
pub use task_queue::TaskQueue;
pub use worker::{Worker, WorkerState};
