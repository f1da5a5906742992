mod error;
mod tracker;
mod types;

pub use error::TrackerError;
pub use tracker::{TrackerParts, TrackerScheduler};
pub use types::{CaptureInterval, TrackerConfig, TrackerMode, TrackerStatus};
