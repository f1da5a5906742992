use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tokio::net::TcpStream;

use super::{ConnectivityCheckError, NetworkState, NetworkStatus};

/// Reports connected when a TCP connection to `addr` can be opened.
pub struct TcpProbe {
    addr: String,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }

    /// Probes the host and port a remote base URL points at.
    pub fn for_url(url: &str, connect_timeout: Duration) -> Result<Self, ConnectivityCheckError> {
        let parsed = Url::parse(url).map_err(|e| ConnectivityCheckError::Probe(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ConnectivityCheckError::Probe(format!("no host in {}", url)))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| ConnectivityCheckError::Probe(format!("no port for {}", url)))?;
        Ok(Self::new(format!("{}:{}", host, port), connect_timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl NetworkState for TcpProbe {
    async fn fetch(&self) -> Result<NetworkStatus, ConnectivityCheckError> {
        let is_connected =
            match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr)).await {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    log::debug!("Probe {} unreachable: {}", self.addr, e);
                    false
                }
                Err(_) => {
                    log::debug!("Probe {} timed out", self.addr);
                    false
                }
            };
        Ok(NetworkStatus { is_connected })
    }
}
