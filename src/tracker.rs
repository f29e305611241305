mod centroid;
mod centroid_tracker;
pub mod matching;
mod rect;
mod tracked_object;

pub use centroid::Centroid;
pub use centroid_tracker::{CentroidTracker, TrackerConfig};
pub use matching::AssignmentResult;
pub use rect::BoundingBox;
pub use tracked_object::{ObjectId, TrackedObject};
