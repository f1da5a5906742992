use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

use super::{CaptureError, CaptureErrorCode, PositionProvider, PositionRequest};
use crate::point::RawPosition;

pub const DEFAULT_GPSD_ADDR: &str = "127.0.0.1:2947";

const WATCH: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

const MODE_2D: u8 = 2;
const MODE_3D: u8 = 3;

/// Reads a fix from a gpsd daemon.
///
/// With `high_accuracy` the provider holds out for a 3D fix and only falls
/// back to the best 2D fix it saw once `timeout` expires.
pub struct GpsdProvider {
    addr: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Report {
    class: String,
    #[serde(default)]
    mode: u8,
    time: Option<DateTime<Utc>>,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    speed: Option<f64>,
    track: Option<f64>,
    eph: Option<f64>,
}

impl Report {
    fn into_position(self) -> Option<RawPosition> {
        if self.class != "TPV" || self.mode < MODE_2D {
            return None;
        }
        Some(RawPosition {
            latitude: self.lat?,
            longitude: self.lon?,
            speed: self.speed,
            altitude: self.alt,
            accuracy: self.eph,
            heading: self.track,
            timestamp: self.time.unwrap_or_else(Utc::now),
        })
    }
}

impl GpsdProvider {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PositionProvider for GpsdProvider {
    async fn current_position(&self, request: PositionRequest) -> Result<RawPosition, CaptureError> {
        let deadline = Instant::now() + self.timeout;

        let mut stream = match timeout_at(deadline, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(CaptureError::new(
                    CaptureErrorCode::PositionUnavailable,
                    format!("gpsd at {}: {}", self.addr, e),
                ))
            }
            Err(_) => return Err(timed_out(&self.addr)),
        };
        stream
            .write_all(WATCH)
            .await
            .map_err(|e| CaptureError::new(CaptureErrorCode::Other, e.to_string()))?;

        let mut lines = BufReader::new(stream).lines();
        let mut fallback: Option<RawPosition> = None;

        loop {
            let line = match timeout_at(deadline, lines.next_line()).await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    return fallback.ok_or_else(|| {
                        CaptureError::new(
                            CaptureErrorCode::PositionUnavailable,
                            "gpsd closed the connection",
                        )
                    })
                }
                Ok(Err(e)) => return Err(CaptureError::new(CaptureErrorCode::Other, e.to_string())),
                Err(_) => return fallback.ok_or_else(|| timed_out(&self.addr)),
            };

            let report: Report = match serde_json::from_str(&line) {
                Ok(report) => report,
                Err(e) => {
                    log::debug!("Ignoring gpsd line: {}", e);
                    continue;
                }
            };
            let mode = report.mode;
            let Some(position) = report.into_position() else {
                continue;
            };

            if !request.high_accuracy || mode >= MODE_3D {
                return Ok(position);
            }
            fallback = Some(position);
        }
    }
}

fn timed_out(addr: &str) -> CaptureError {
    CaptureError::new(
        CaptureErrorCode::Timeout,
        format!("no fix from gpsd at {}", addr),
    )
}
