use thiserror::Error;

/// The backlog could not durably record or read points.
///
/// Unlike a submission failure this may mean data loss, so it is always
/// returned to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt backlog entry at line {line}: {message}")]
    Corrupt { line: usize, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
