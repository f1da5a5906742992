use std::collections::HashSet;

use async_trait::async_trait;

use super::{PermissionError, PermissionGate, PermissionKind, PermissionStatus};

/// Grants exactly the permissions listed in the configuration.
pub struct ConfigPermissions {
    granted: HashSet<PermissionKind>,
}

impl ConfigPermissions {
    pub fn new(granted: impl IntoIterator<Item = PermissionKind>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }

    fn status(&self, kind: PermissionKind) -> PermissionStatus {
        if self.granted.contains(&kind) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}

#[async_trait]
impl PermissionGate for ConfigPermissions {
    async fn check(&self, kind: PermissionKind) -> Result<PermissionStatus, PermissionError> {
        Ok(self.status(kind))
    }

    // There is no prompt on a headless host; a request answers like a check.
    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus, PermissionError> {
        Ok(self.status(kind))
    }
}
