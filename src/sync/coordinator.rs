use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::connectivity::ConnectivityOracle;
use crate::point::{Point, RawPosition};
use crate::sink::{RemoteSink, SubmissionError};
use crate::store::{DrainReport, PointStore, StoreError, StoreResult};

#[derive(Debug)]
pub enum BufferReason {
    Offline,
    /// The drain stopped early; sending now would overtake older points.
    BacklogPending,
    SubmitFailed(SubmissionError),
    /// The backlog could not be read back for draining. The new point was
    /// still appended behind it.
    BacklogUnreadable(StoreError),
}

#[derive(Debug)]
pub enum CaptureOutcome {
    Sent {
        point: Point,
        drained: DrainReport,
    },
    Buffered {
        point: Point,
        reason: BufferReason,
        drained: Option<DrainReport>,
    },
}

impl CaptureOutcome {
    pub fn point(&self) -> &Point {
        match self {
            CaptureOutcome::Sent { point, .. } | CaptureOutcome::Buffered { point, .. } => point,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, CaptureOutcome::Sent { .. })
    }

    /// Points delivered by this capture, backlog included.
    pub fn delivered(&self) -> usize {
        match self {
            CaptureOutcome::Sent { drained, .. } => drained.delivered + 1,
            CaptureOutcome::Buffered { drained, .. } => {
                drained.as_ref().map(|d| d.delivered).unwrap_or(0)
            }
        }
    }
}

/// A captured point that could not be written to the backlog. The point is
/// handed back so the caller still holds it.
#[derive(Debug, Error)]
#[error("point {} was not persisted: {source}", point.id)]
pub struct UnpersistedPoint {
    pub point: Point,
    #[source]
    pub source: StoreError,
}

#[derive(Debug)]
pub struct FlushOutcome {
    pub online: bool,
    pub report: DrainReport,
}

/// Decides, per capture, between buffering locally and flushing then sending.
pub struct SyncCoordinator {
    store: Arc<PointStore>,
    oracle: ConnectivityOracle,
    sink: Arc<dyn RemoteSink>,
    // One capture or flush at a time.
    cycle: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new(store: Arc<PointStore>, oracle: ConnectivityOracle, sink: Arc<dyn RemoteSink>) -> Self {
        Self {
            store,
            oracle,
            sink,
            cycle: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<PointStore> {
        &self.store
    }

    /// Turns `raw` into a point and either delivers it or buffers it.
    ///
    /// When online the backlog is drained first and the new point is only
    /// sent if the drain emptied it, so delivery order always matches
    /// capture order. A backlog that cannot be drained never costs the new
    /// point: it is appended regardless. Only a failed append is an error.
    pub async fn handle_capture(&self, raw: RawPosition) -> Result<CaptureOutcome, UnpersistedPoint> {
        let point = Point::capture(&raw);
        let _cycle = self.cycle.lock().await;

        if !self.oracle.is_online().await {
            log::info!("Offline, buffering point {}", point.id);
            return self.buffer(point, BufferReason::Offline, None).await;
        }

        let drained = match self.store.drain_all(self.sink.as_ref()).await {
            Ok(report) => report,
            Err(e) => {
                log::error!("Backlog drain failed, buffering point {}: {}", point.id, e);
                return self.buffer(point, BufferReason::BacklogUnreadable(e), None).await;
            }
        };
        if !drained.is_complete() {
            log::info!(
                "Backlog still holds {} points, buffering point {} behind them",
                drained.remaining,
                point.id
            );
            return self
                .buffer(point, BufferReason::BacklogPending, Some(drained))
                .await;
        }

        match self.sink.submit(&point).await {
            Ok(()) => {
                log::info!("Sent point {}", point.id);
                Ok(CaptureOutcome::Sent { point, drained })
            }
            Err(e) => {
                log::warn!("Submitting point {} failed: {}", point.id, e);
                self.buffer(point, BufferReason::SubmitFailed(e), Some(drained))
                    .await
            }
        }
    }

    async fn buffer(
        &self,
        point: Point,
        reason: BufferReason,
        drained: Option<DrainReport>,
    ) -> Result<CaptureOutcome, UnpersistedPoint> {
        match self.store.append(&point).await {
            Ok(()) => Ok(CaptureOutcome::Buffered {
                point,
                reason,
                drained,
            }),
            Err(source) => Err(UnpersistedPoint { point, source }),
        }
    }

    /// Drains the backlog without a new capture, if the network is up.
    pub async fn flush(&self) -> StoreResult<FlushOutcome> {
        let _cycle = self.cycle.lock().await;

        if !self.oracle.is_online().await {
            let remaining = self.store.len().await?;
            log::info!("Offline, {} points left in backlog", remaining);
            return Ok(FlushOutcome {
                online: false,
                report: DrainReport {
                    remaining,
                    ..DrainReport::default()
                },
            });
        }

        let report = self.store.drain_all(self.sink.as_ref()).await?;
        Ok(FlushOutcome {
            online: true,
            report,
        })
    }
}
