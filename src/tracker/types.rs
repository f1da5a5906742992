use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::TrackerError;
use crate::point::Point;

/// The capture intervals a user may pick from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(try_from = "String", into = "String")]
pub enum CaptureInterval {
    #[strum(serialize = "1s")]
    OneSecond,
    #[strum(serialize = "3s")]
    ThreeSeconds,
    #[strum(serialize = "5s")]
    FiveSeconds,
    #[default]
    #[strum(serialize = "10s")]
    TenSeconds,
}

impl CaptureInterval {
    pub const ALL: [CaptureInterval; 4] = [
        CaptureInterval::TenSeconds,
        CaptureInterval::FiveSeconds,
        CaptureInterval::ThreeSeconds,
        CaptureInterval::OneSecond,
    ];

    pub fn duration(&self) -> Duration {
        match self {
            CaptureInterval::OneSecond => Duration::from_secs(1),
            CaptureInterval::ThreeSeconds => Duration::from_secs(3),
            CaptureInterval::FiveSeconds => Duration::from_secs(5),
            CaptureInterval::TenSeconds => Duration::from_secs(10),
        }
    }

    pub fn from_duration(duration: Duration) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.duration() == duration)
    }
}

impl FromStr for CaptureInterval {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        humantime::parse_duration(s.trim())
            .ok()
            .and_then(Self::from_duration)
            .ok_or_else(|| TrackerError::UnsupportedInterval(s.to_string()))
    }
}

impl TryFrom<String> for CaptureInterval {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CaptureInterval> for String {
    fn from(value: CaptureInterval) -> Self {
        value.to_string()
    }
}

/// Runtime configuration. `interval` is fixed while `active` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerConfig {
    pub interval: CaptureInterval,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub enum TrackerMode {
    Stopped,
    Running {
        since: DateTime<Utc>,
        #[schema(value_type = String, example = "5s")]
        interval: CaptureInterval,
    },
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TrackerStatus {
    pub mode: TrackerMode,
    #[schema(value_type = String, example = "10s")]
    pub interval: CaptureInterval,
    pub ticks: u64,
    pub failed_captures: u64,
    /// Captures that reached neither the remote nor the backlog.
    pub unpersisted_points: u64,
    pub last_point: Option<Point>,
    pub last_error: Option<String>,
    pub notification: String,
}
