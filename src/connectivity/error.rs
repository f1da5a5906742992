use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectivityCheckError {
    #[error("network probe failed: {0}")]
    Probe(String),
    #[error("network check timed out")]
    Timeout,
}
