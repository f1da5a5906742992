mod error;
mod gate;
mod wait;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::PermissionError;
pub use gate::ConfigPermissions;
pub use wait::{wait_for_permissions, RetryPolicy};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermissionKind {
    FineLocation,
    BackgroundLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Host-side permission API.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn check(&self, kind: PermissionKind) -> Result<PermissionStatus, PermissionError>;
    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus, PermissionError>;
}
