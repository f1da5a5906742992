use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::TrackerError;
use super::types::{CaptureInterval, TrackerConfig, TrackerMode, TrackerStatus};
use crate::background::{BackgroundService, Notifier, StopSignal, StoppingTask, TaskOptions};
use crate::location::LocationSource;
use crate::permission::{wait_for_permissions, PermissionError, PermissionGate, RetryPolicy};
use crate::point::Point;
use crate::sync::{BufferReason, CaptureOutcome, SyncCoordinator, UnpersistedPoint};

/// Collaborators the capture cycle calls into.
pub struct TrackerParts {
    pub location: Arc<LocationSource>,
    pub coordinator: Arc<SyncCoordinator>,
    pub permissions: Arc<dyn PermissionGate>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Default)]
struct Shared {
    since: Option<DateTime<Utc>>,
    ticks: u64,
    failed_captures: u64,
    unpersisted_points: u64,
    last_point: Option<Point>,
    last_error: Option<String>,
}

/// Owns the periodic capture cycle and its start/stop lifecycle.
pub struct TrackerScheduler {
    config: TrackerConfig,
    parts: TrackerParts,
    service: BackgroundService,
    shared: Arc<StdMutex<Shared>>,
}

impl TrackerScheduler {
    pub fn new(interval: CaptureInterval, parts: TrackerParts, options: TaskOptions) -> Self {
        Self {
            config: TrackerConfig {
                interval,
                active: false,
            },
            parts,
            service: BackgroundService::new(options),
            shared: Arc::new(StdMutex::new(Shared::default())),
        }
    }

    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    pub fn is_active(&self) -> bool {
        self.config.active
    }

    /// Picks the interval for the next `start`. Refused while running.
    pub fn set_interval(&mut self, interval: CaptureInterval) -> Result<(), TrackerError> {
        if self.config.active {
            return Err(TrackerError::IntervalLocked);
        }
        self.config.interval = interval;
        Ok(())
    }

    /// Waits for location permissions, then begins capturing every `interval`.
    pub async fn start(&mut self, interval: CaptureInterval) -> Result<TrackerMode, TrackerError> {
        if self.config.active {
            return Err(TrackerError::AlreadyRunning);
        }
        self.permission_wait().await?;
        self.launch(interval)
    }

    /// The permission wait of [`start`](Self::start), detached from `self`
    /// so a caller can run it without holding the scheduler.
    pub fn permission_wait(
        &self,
    ) -> impl Future<Output = Result<(), PermissionError>> + Send + 'static {
        let gate = self.parts.permissions.clone();
        let retry = self.parts.retry;
        async move { wait_for_permissions(gate.as_ref(), retry).await }
    }

    /// Begins capturing every `interval`. Permissions must already be granted.
    pub fn launch(&mut self, interval: CaptureInterval) -> Result<TrackerMode, TrackerError> {
        if self.config.active {
            return Err(TrackerError::AlreadyRunning);
        }

        let location = self.parts.location.clone();
        let coordinator = self.parts.coordinator.clone();
        let shared = self.shared.clone();
        let period = interval.duration();

        self.service
            .start(move |stop, notifier| {
                run_capture_loop(period, location, coordinator, shared, stop, notifier)
            })
            .map_err(|_| TrackerError::AlreadyRunning)?;

        self.config = TrackerConfig {
            interval,
            active: true,
        };
        {
            let mut locked = self.shared.lock().unwrap();
            locked.since = Some(Utc::now());
            locked.last_error = None;
        }
        log::info!("Tracker started, capturing every {}", interval);

        Ok(self.mode())
    }

    /// Prevents further ticks. A capture already in flight finishes first.
    pub async fn stop(&mut self) -> TrackerMode {
        if let Some(stopping) = self.halt() {
            stopping.finished().await;
        }
        self.mode()
    }

    /// Marks the tracker stopped and signals the loop without waiting for
    /// an in-flight capture. Await the handle for that.
    pub fn halt(&mut self) -> Option<StoppingTask> {
        let stopping = self.service.signal_stop();
        if self.config.active {
            log::info!("Tracker stopped");
        }
        self.config.active = false;
        self.shared.lock().unwrap().since = None;
        stopping
    }

    pub fn mode(&self) -> TrackerMode {
        let since = self.shared.lock().unwrap().since;
        match (self.config.active, since) {
            (true, Some(since)) => TrackerMode::Running {
                since,
                interval: self.config.interval,
            },
            _ => TrackerMode::Stopped,
        }
    }

    pub fn status(&self) -> TrackerStatus {
        let mode = self.mode();
        let locked = self.shared.lock().unwrap();
        TrackerStatus {
            mode,
            interval: self.config.interval,
            ticks: locked.ticks,
            failed_captures: locked.failed_captures,
            unpersisted_points: locked.unpersisted_points,
            last_point: locked.last_point.clone(),
            last_error: locked.last_error.clone(),
            notification: self.service.notifier().text(),
        }
    }
}

async fn run_capture_loop(
    period: Duration,
    location: Arc<LocationSource>,
    coordinator: Arc<SyncCoordinator>,
    shared: Arc<StdMutex<Shared>>,
    mut stop: StopSignal,
    notifier: Notifier,
) {
    loop {
        if stop.is_stopped() {
            break;
        }

        let should_stop = tokio::select! {
            biased;
            _ = stop.wait() => true,
            _ = tokio::time::sleep(period) => false,
        };
        if should_stop {
            break;
        }

        run_tick(&location, &coordinator, &shared, &notifier).await;
    }

    log::debug!("Capture loop exited");
}

async fn run_tick(
    location: &LocationSource,
    coordinator: &SyncCoordinator,
    shared: &StdMutex<Shared>,
    notifier: &Notifier,
) {
    let tick = {
        let mut locked = shared.lock().unwrap();
        locked.ticks += 1;
        locked.ticks
    };

    let raw = match location.capture().await {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("Tick {}: {}", tick, e);
            shared.lock().unwrap().failed_captures += 1;
            return;
        }
    };

    match coordinator.handle_capture(raw).await {
        Ok(outcome) => {
            let storage_error = match &outcome {
                CaptureOutcome::Buffered {
                    reason: BufferReason::BacklogUnreadable(e),
                    ..
                } => Some(format!("backlog unreadable: {}", e)),
                CaptureOutcome::Buffered { reason, .. } => {
                    log::debug!("Tick {}: buffered ({:?})", tick, reason);
                    None
                }
                CaptureOutcome::Sent { .. } => None,
            };

            match &storage_error {
                Some(message) => notifier.update(format!("storage error: {}", message)),
                None => {
                    let backlog = match coordinator.store().len().await {
                        Ok(len) => Some(len),
                        Err(e) => {
                            log::warn!("Tick {}: could not count backlog: {}", tick, e);
                            None
                        }
                    };
                    notifier.update(summarize(&outcome, backlog));
                }
            }

            let mut locked = shared.lock().unwrap();
            locked.last_point = Some(outcome.point().clone());
            locked.last_error = storage_error;
        }
        Err(UnpersistedPoint { point, source }) => {
            log::error!("Tick {}: point {} was not persisted: {}", tick, point.id, source);
            notifier.update(format!("storage error: {}", source));
            let mut locked = shared.lock().unwrap();
            locked.unpersisted_points += 1;
            locked.last_error = Some(source.to_string());
            locked.last_point = Some(point);
        }
    }
}

fn summarize(outcome: &CaptureOutcome, backlog: Option<usize>) -> String {
    let backlog = match backlog {
        Some(len) => len.to_string(),
        None => "unknown".to_string(),
    };
    if outcome.is_sent() {
        format!("sent {} (backlog {})", outcome.delivered(), backlog)
    } else {
        format!("buffered (backlog {})", backlog)
    }
}
