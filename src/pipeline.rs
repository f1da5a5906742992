//! Wires the capture pipeline together from a [`Config`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::connectivity::{ConnectivityCheckError, ConnectivityOracle, NetworkState, TcpProbe};
use crate::location::{GpsdProvider, LocationSource};
use crate::permission::ConfigPermissions;
use crate::sink::{HttpSink, SubmissionError};
use crate::store::{PointStore, StoreError};
use crate::sync::SyncCoordinator;
use crate::tracker::{TrackerParts, TrackerScheduler};
use crate::web::Config;

// gpsd gets the configured timeout; the source allows a little more so a
// late 2D fallback is not cut off.
const CAPTURE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("backlog: {0}")]
    Store(#[from] StoreError),
    #[error("remote: {0}")]
    Sink(#[from] SubmissionError),
    #[error("connectivity probe: {0}")]
    Connectivity(#[from] ConnectivityCheckError),
}

pub struct Pipeline {
    pub coordinator: Arc<SyncCoordinator>,
    pub tracker: TrackerScheduler,
}

/// Everything but the scheduler; enough to inspect or flush the backlog.
pub fn build_coordinator(config: &Config) -> Result<Arc<SyncCoordinator>, BuildError> {
    let store = Arc::new(PointStore::open(&config.storage.backlog_path)?);
    let sink = Arc::new(HttpSink::new(&config.remote.base_url, config.remote.timeout)?);

    let probe = match &config.connectivity.probe {
        Some(addr) => TcpProbe::new(addr.clone(), config.connectivity.timeout),
        None => TcpProbe::for_url(&config.remote.base_url, config.connectivity.timeout)?,
    };
    log::info!(
        "Submitting to {}, probing {}, backlog at {}",
        sink.endpoint(),
        probe.addr(),
        store.path().display()
    );
    let probe: Arc<dyn NetworkState> = Arc::new(probe);
    let oracle = ConnectivityOracle::new(probe, config.connectivity.timeout);

    Ok(Arc::new(SyncCoordinator::new(store, oracle, sink)))
}

pub fn build(config: &Config) -> Result<Pipeline, BuildError> {
    let coordinator = build_coordinator(config)?;

    let provider = Arc::new(GpsdProvider::new(
        config.location.gpsd.clone(),
        config.location.timeout,
    ));
    let location = Arc::new(LocationSource::new(
        provider,
        config.location.timeout + CAPTURE_GRACE,
    ));
    let permissions = Arc::new(ConfigPermissions::new(
        config.permissions.granted.iter().copied(),
    ));

    let parts = TrackerParts {
        location,
        coordinator: coordinator.clone(),
        permissions,
        retry: config.permissions.retry_policy(),
    };
    let tracker = TrackerScheduler::new(
        config.tracker.interval,
        parts,
        (&config.notification).into(),
    );

    Ok(Pipeline {
        coordinator,
        tracker,
    })
}
