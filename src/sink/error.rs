use thiserror::Error;

/// Every variant is retryable: the point stays in (or goes to) the backlog.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote rejected point with status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for SubmissionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SubmissionError::Timeout
        } else if let Some(status) = err.status() {
            SubmissionError::Status(status.as_u16())
        } else if err.is_builder() || err.is_body() {
            SubmissionError::Serialization(err.to_string())
        } else {
            SubmissionError::Transport(err.to_string())
        }
    }
}
