use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::tracker::{CaptureInterval, TrackerError, TrackerMode, TrackerStatus};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::ApiPermission;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartRequest {
    /// One of the allowed intervals; the configured interval when omitted.
    #[schema(example = "5s")]
    pub interval: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IntervalRequest {
    #[schema(example = "3s")]
    pub interval: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IntervalsResponse {
    pub allowed: Vec<String>,
    pub selected: String,
}

fn parse_interval(value: &str) -> ApiResult<CaptureInterval> {
    value.parse::<CaptureInterval>().map_err(ApiError::from)
}

#[utoipa::path(
    post,
    path = "/api/tracker/start",
    request_body = StartRequest,
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Tracker started", body = TrackerMode),
        (status = 400, description = "Unsupported interval", body = ErrorResponse),
        (status = 403, description = "Location permission denied", body = ErrorResponse),
        (status = 409, description = "Tracker already running", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "tracker"
)]
pub async fn start(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    request: Option<Json<StartRequest>>,
) -> ApiResult<Json<TrackerMode>> {
    require_permission(&user, ApiPermission::Control)?;

    let request = request.map(|Json(r)| r).unwrap_or_default();

    // The permission wait runs without holding the scheduler.
    let (interval, permission_wait) = {
        let tracker = state.tracker.lock().await;
        if tracker.is_active() {
            return Err(TrackerError::AlreadyRunning.into());
        }
        let interval = match request.interval.as_deref() {
            Some(value) => parse_interval(value)?,
            None => tracker.config().interval,
        };
        (interval, tracker.permission_wait())
    };
    permission_wait.await.map_err(TrackerError::from)?;

    let mode = state.tracker.lock().await.launch(interval)?;
    log::info!("Tracker started by {}", user.name);
    Ok(Json(mode))
}

#[utoipa::path(
    post,
    path = "/api/tracker/stop",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Tracker stopped", body = TrackerMode),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "tracker"
)]
pub async fn stop(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<TrackerMode>> {
    require_permission(&user, ApiPermission::Control)?;
    let (mode, stopping) = {
        let mut tracker = state.tracker.lock().await;
        let stopping = tracker.halt();
        (tracker.mode(), stopping)
    };
    if let Some(stopping) = stopping {
        stopping.finished().await;
    }
    log::info!("Tracker stopped by {}", user.name);
    Ok(Json(mode))
}

#[utoipa::path(
    get,
    path = "/api/tracker/status",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Tracker status", body = TrackerStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "tracker"
)]
pub async fn status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<TrackerStatus>> {
    require_permission(&user, ApiPermission::Read)?;
    let tracker = state.tracker.lock().await;
    Ok(Json(tracker.status()))
}

#[utoipa::path(
    get,
    path = "/api/tracker/intervals",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Allowed capture intervals", body = IntervalsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "tracker"
)]
pub async fn intervals(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<IntervalsResponse>> {
    require_permission(&user, ApiPermission::Read)?;
    let tracker = state.tracker.lock().await;
    Ok(Json(IntervalsResponse {
        allowed: CaptureInterval::ALL.iter().map(|i| i.to_string()).collect(),
        selected: tracker.config().interval.to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/tracker/interval",
    request_body = IntervalRequest,
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Interval selected", body = IntervalsResponse),
        (status = 400, description = "Unsupported interval", body = ErrorResponse),
        (status = 409, description = "Tracker is running", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "tracker"
)]
pub async fn set_interval(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<IntervalRequest>,
) -> ApiResult<Json<IntervalsResponse>> {
    require_permission(&user, ApiPermission::Control)?;

    let interval = parse_interval(&request.interval)?;
    let mut tracker = state.tracker.lock().await;
    tracker.set_interval(interval)?;

    Ok(Json(IntervalsResponse {
        allowed: CaptureInterval::ALL.iter().map(|i| i.to_string()).collect(),
        selected: interval.to_string(),
    }))
}
