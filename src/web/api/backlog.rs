use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::point::Point;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::ApiPermission;

#[derive(Debug, Serialize, ToSchema)]
pub struct BacklogResponse {
    pub len: usize,
    pub points: Vec<Point>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FlushResponse {
    pub online: bool,
    pub delivered: usize,
    pub remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/backlog",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Points awaiting upload, oldest first", body = BacklogResponse),
        (status = 500, description = "Backlog unreadable", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "backlog"
)]
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<BacklogResponse>> {
    require_permission(&user, ApiPermission::Read)?;
    let points = state.coordinator.store().peek_all().await?;
    Ok(Json(BacklogResponse {
        len: points.len(),
        points,
    }))
}

#[utoipa::path(
    post,
    path = "/api/backlog/flush",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Flush attempted", body = FlushResponse),
        (status = 500, description = "Backlog could not be updated", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "backlog"
)]
pub async fn flush(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<FlushResponse>> {
    require_permission(&user, ApiPermission::Control)?;
    let outcome = state.coordinator.flush().await?;
    Ok(Json(FlushResponse {
        online: outcome.online,
        delivered: outcome.report.delivered,
        remaining: outcome.report.remaining,
        failure: outcome.report.failure.map(|e| e.to_string()),
    }))
}
