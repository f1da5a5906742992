use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use super::{RemoteSink, SubmissionError};
use crate::point::Point;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts points as JSON to `{base_url}/points`.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSink {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SubmissionError> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|base| base.join("points"))
            .map_err(|e| SubmissionError::Transport(format!("invalid base url: {}", e)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteSink for HttpSink {
    async fn submit(&self, point: &Point) -> Result<(), SubmissionError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(point)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::Status(status.as_u16()));
        }

        log::debug!("Point {} accepted ({})", point.id, status);
        Ok(())
    }
}
