use std::fmt;

use thiserror::Error;

/// Failure codes as reported by platform location services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Other,
}

impl CaptureErrorCode {
    pub fn code(&self) -> i32 {
        match self {
            CaptureErrorCode::PermissionDenied => 1,
            CaptureErrorCode::PositionUnavailable => 2,
            CaptureErrorCode::Timeout => 3,
            CaptureErrorCode::Other => -1,
        }
    }
}

impl fmt::Display for CaptureErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The platform failed to produce a position. The tick is skipped.
#[derive(Debug, Clone, Error)]
#[error("capture failed ({code}): {message}")]
pub struct CaptureError {
    pub code: CaptureErrorCode,
    pub message: String,
}

impl CaptureError {
    pub fn new(code: CaptureErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
