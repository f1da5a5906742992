mod error;
mod oracle;
mod probe;

use async_trait::async_trait;

pub use error::ConnectivityCheckError;
pub use oracle::{ConnectivityOracle, DEFAULT_CHECK_TIMEOUT};
pub use probe::TcpProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub is_connected: bool,
}

/// Host-side source of the network reachability signal.
#[async_trait]
pub trait NetworkState: Send + Sync {
    async fn fetch(&self) -> Result<NetworkStatus, ConnectivityCheckError>;
}
