mod error;
mod http;

use async_trait::async_trait;

use crate::point::Point;

pub use error::SubmissionError;
pub use http::{HttpSink, DEFAULT_TIMEOUT};

/// Delivers one point to the remote service.
///
/// Implementations must tolerate the same point being submitted more than
/// once; the backlog may resend a point whose earlier delivery succeeded.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn submit(&self, point: &Point) -> Result<(), SubmissionError>;
}
