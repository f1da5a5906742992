use std::time::Duration;

use super::{PermissionError, PermissionGate, PermissionKind};

/// Bounded exponential backoff for the startup permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// Waits until location permissions are granted, giving up after
/// `policy.max_attempts` rounds.
///
/// Each round checks foreground location and requests background location.
pub async fn wait_for_permissions(
    gate: &dyn PermissionGate,
    policy: RetryPolicy,
) -> Result<(), PermissionError> {
    let mut attempt = 0;
    let mut delay = policy.initial_backoff;

    loop {
        attempt += 1;

        let denied = first_denied(gate).await?;
        let Some(kind) = denied else {
            log::info!("Location permissions granted");
            return Ok(());
        };

        if attempt >= policy.max_attempts {
            log::warn!("Giving up on permission {} after {} attempts", kind, attempt);
            return Err(PermissionError::Denied {
                kind,
                attempts: attempt,
            });
        }

        log::warn!(
            "Permission {} not granted (attempt {}/{}), retrying in {:?}",
            kind,
            attempt,
            policy.max_attempts,
            delay
        );
        tokio::time::sleep(delay).await;
        delay = std::cmp::min(delay * 2, policy.max_backoff);
    }
}

async fn first_denied(gate: &dyn PermissionGate) -> Result<Option<PermissionKind>, PermissionError> {
    if !gate.check(PermissionKind::FineLocation).await?.is_granted() {
        return Ok(Some(PermissionKind::FineLocation));
    }
    if !gate
        .request(PermissionKind::BackgroundLocation)
        .await?
        .is_granted()
    {
        return Ok(Some(PermissionKind::BackgroundLocation));
    }
    Ok(None)
}
