//! Result snapshots, the shared result queue and their aggregation.

mod aggregator;
mod export;
mod queue;
mod result;

pub use aggregator::{OverallTotals, ProcessingStats, ResultAggregator, Summary, TaskSummary};
pub use export::{ExportFormat, ExportRecord};
pub use queue::{Backpressure, ResultSender, result_queue};
pub use result::{CountResult, ObjectState};
