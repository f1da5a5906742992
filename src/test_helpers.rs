//! Scripted collaborators shared by the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::connectivity::{ConnectivityCheckError, NetworkState, NetworkStatus};
use crate::location::{CaptureError, CaptureErrorCode, PositionProvider, PositionRequest};
use crate::permission::{PermissionError, PermissionGate, PermissionKind, PermissionStatus};
use crate::point::{Point, RawPosition};
use crate::sink::{RemoteSink, SubmissionError};

pub fn make_position(seq: u32) -> RawPosition {
    RawPosition {
        latitude: -23.55 + f64::from(seq) * 0.001,
        longitude: -46.63,
        speed: Some(1.0),
        altitude: None,
        accuracy: Some(5.0),
        heading: None,
        timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::seconds(i64::from(seq)),
    }
}

pub fn make_point(seq: u32) -> Point {
    Point::capture(&make_position(seq))
}

/// A remote that records every submission and keys stored records by id.
#[derive(Default)]
pub struct RecordingSink {
    submissions: Mutex<Vec<Point>>,
    records: Mutex<BTreeMap<Uuid, Point>>,
    accept_budget: Mutex<Option<usize>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    /// Accepts `count` submissions, then fails every one after.
    pub fn failing_after(count: usize) -> Self {
        let sink = Self::default();
        *sink.accept_budget.lock().unwrap() = Some(count);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Points the remote accepted, in the order they arrived.
    pub fn received(&self) -> Vec<Point> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn received_ids(&self) -> Vec<Uuid> {
        self.received().iter().map(|p| p.id).collect()
    }

    /// Distinct points stored remotely.
    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteSink for RecordingSink {
    async fn submit(&self, point: &Point) -> Result<(), SubmissionError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SubmissionError::Status(503));
        }
        {
            let mut budget = self.accept_budget.lock().unwrap();
            match budget.as_mut() {
                Some(0) => return Err(SubmissionError::Transport("connection reset".into())),
                Some(n) => *n -= 1,
                None => {}
            }
        }
        self.submissions.lock().unwrap().push(point.clone());
        self.records.lock().unwrap().insert(point.id, point.clone());
        Ok(())
    }
}

/// Network state that can be flipped between online and offline.
pub struct ScriptedNetwork {
    connected: AtomicBool,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub checks: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
            fail: AtomicBool::new(false),
            delay: Mutex::new(None),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl NetworkState for ScriptedNetwork {
    async fn fetch(&self) -> Result<NetworkStatus, ConnectivityCheckError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConnectivityCheckError::Probe("netlink unavailable".into()));
        }
        Ok(NetworkStatus {
            is_connected: self.connected.load(Ordering::SeqCst),
        })
    }
}

/// Position provider that replays a script, then keeps producing fixes.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<RawPosition, CaptureError>>>,
    requests: Mutex<Vec<PositionRequest>>,
    delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn push(&self, result: Result<RawPosition, CaptureError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn push_error(&self, code: CaptureErrorCode) {
        self.push(Err(CaptureError::new(code, "scripted failure")));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<PositionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PositionProvider for ScriptedProvider {
    async fn current_position(&self, request: PositionRequest) -> Result<RawPosition, CaptureError> {
        let seq = self.calls.fetch_add(1, Ordering::SeqCst) as u32;
        self.requests.lock().unwrap().push(request);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(make_position(seq)))
    }
}

/// Permission gate that denies the first `denials` checks.
pub struct ScriptedPermissions {
    denials: AtomicUsize,
    pub checks: AtomicUsize,
}

impl ScriptedPermissions {
    pub fn granted() -> Self {
        Self::denying(0)
    }

    pub fn denying(denials: usize) -> Self {
        Self {
            denials: AtomicUsize::new(denials),
            checks: AtomicUsize::new(0),
        }
    }

    fn answer(&self) -> PermissionStatus {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let left = self.denials.load(Ordering::SeqCst);
        if left > 0 {
            self.denials.store(left - 1, Ordering::SeqCst);
            PermissionStatus::Denied
        } else {
            PermissionStatus::Granted
        }
    }
}

#[async_trait]
impl PermissionGate for ScriptedPermissions {
    async fn check(&self, _kind: PermissionKind) -> Result<PermissionStatus, PermissionError> {
        Ok(self.answer())
    }

    async fn request(&self, _kind: PermissionKind) -> Result<PermissionStatus, PermissionError> {
        Ok(PermissionStatus::Granted)
    }
}
