use thiserror::Error;

use super::PermissionKind;

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("permission {kind} denied after {attempts} attempts")]
    Denied { kind: PermissionKind, attempts: u32 },
    #[error("permission check failed: {0}")]
    Check(String),
}
