use thiserror::Error;

use crate::permission::PermissionError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker already running")]
    AlreadyRunning,
    #[error("interval cannot change while the tracker is running")]
    IntervalLocked,
    #[error("unsupported interval: {0}")]
    UnsupportedInterval(String),
    #[error("permission error: {0}")]
    Permission(#[from] PermissionError),
}
