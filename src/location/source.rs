use std::sync::Arc;
use std::time::Duration;

use super::{CaptureError, CaptureErrorCode, PositionProvider, PositionRequest};
use crate::point::RawPosition;

pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

const REQUEST: PositionRequest = PositionRequest {
    high_accuracy: true,
    distance_filter_m: 0.0,
};

/// One position per call, always high accuracy and unfiltered.
pub struct LocationSource {
    provider: Arc<dyn PositionProvider>,
    timeout: Duration,
}

impl LocationSource {
    pub fn new(provider: Arc<dyn PositionProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn capture(&self) -> Result<RawPosition, CaptureError> {
        match tokio::time::timeout(self.timeout, self.provider.current_position(REQUEST)).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::new(
                CaptureErrorCode::Timeout,
                format!("no position within {:?}", self.timeout),
            )),
        }
    }
}
