use std::sync::Arc;
use std::time::Duration;

use super::{ConnectivityCheckError, NetworkState};

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Answers "is a network path usable right now?".
///
/// Any error or a check that outlives `timeout` counts as offline, so an
/// uncertain network leads to buffering rather than a lost point.
#[derive(Clone)]
pub struct ConnectivityOracle {
    state: Arc<dyn NetworkState>,
    timeout: Duration,
}

impl ConnectivityOracle {
    pub fn new(state: Arc<dyn NetworkState>, timeout: Duration) -> Self {
        Self { state, timeout }
    }

    pub async fn is_online(&self) -> bool {
        let result = tokio::time::timeout(self.timeout, self.state.fetch())
            .await
            .unwrap_or(Err(ConnectivityCheckError::Timeout));

        match result {
            Ok(status) => status.is_connected,
            Err(e) => {
                log::warn!("Connectivity check failed: {}", e);
                log::debug!("Treating network as offline");
                false
            }
        }
    }
}
