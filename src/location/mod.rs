mod error;
mod gpsd;
mod source;

use async_trait::async_trait;

use crate::point::RawPosition;

pub use error::{CaptureError, CaptureErrorCode};
pub use gpsd::{GpsdProvider, DEFAULT_GPSD_ADDR};
pub use source::{LocationSource, DEFAULT_CAPTURE_TIMEOUT};

/// Options for a single-shot position request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRequest {
    /// Prefer accuracy over battery life.
    pub high_accuracy: bool,
    /// Minimum movement in metres before a new fix counts. Zero means every
    /// request yields a sample.
    pub distance_filter_m: f64,
}

/// Host-side "get current position" call.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self, request: PositionRequest) -> Result<RawPosition, CaptureError>;
}
