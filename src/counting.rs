//! Per-identity directional counting over centroid tracker output.

mod count_state;
mod engine;
mod trackable_object;

pub use count_state::CountState;
pub use engine::{CountTotals, CountingEngine, CrossingEvent, CrossingKind};
pub use trackable_object::TrackableObject;
