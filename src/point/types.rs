use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A position as reported by the platform, before it gets an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// A captured reading with a durable identity.
///
/// `id` is assigned once in [`Point::capture`] and travels with the point
/// through the backlog, so resubmitting it is idempotent on the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Point {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    #[serde(rename = "time")]
    pub captured_at: DateTime<Utc>,
}

impl Point {
    pub fn capture(position: &RawPosition) -> Self {
        Self {
            id: Uuid::new_v4(),
            latitude: position.latitude,
            longitude: position.longitude,
            speed: normalize_speed(position.speed),
            captured_at: position.timestamp,
        }
    }
}

// Platforms report -1 (or NaN) when speed is unknown.
fn normalize_speed(speed: Option<f64>) -> Option<f64> {
    speed.filter(|s| s.is_finite() && *s >= 0.0)
}
