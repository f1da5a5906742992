use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::sync::SyncCoordinator;
use crate::tracker::TrackerScheduler;

use super::api::error::ErrorResponse;
use super::config::{ApiPermission, Config};

/// Shared handler state. The scheduler sits behind an async mutex because
/// `start` and `stop` await while holding it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tracker: Arc<Mutex<TrackerScheduler>>,
    pub coordinator: Arc<SyncCoordinator>,
}

/// The API key a request authenticated with.
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub name: String,
    permissions: HashSet<ApiPermission>,
}

impl AuthenticatedUser {
    pub fn can(&self, permission: ApiPermission) -> bool {
        self.permissions.contains(&permission)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("expected `Authorization: Bearer <key>`")]
    NotBearer,
    #[error("unknown API key")]
    UnknownKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::with_message("unauthorized", &self.to_string())),
        )
            .into_response()
    }
}

/// The key is valid but lacks the permission the endpoint needs.
#[derive(Debug)]
pub struct ForbiddenError {
    pub required: ApiPermission,
}

impl IntoResponse for ForbiddenError {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::with_message(
                "forbidden",
                &format!("requires {} permission", self.required),
            )),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AuthError::NotBearer)?;

        let key = match value.trim().split_once(' ') {
            Some((scheme, key)) if scheme.eq_ignore_ascii_case("bearer") => key.trim(),
            _ => return Err(AuthError::NotBearer),
        };

        let Some(api_key) = state.config.find_api_key(key) else {
            log::warn!("Rejected request to {} with unknown API key", parts.uri.path());
            return Err(AuthError::UnknownKey);
        };

        Ok(AuthenticatedUser {
            name: api_key.name.clone(),
            permissions: api_key.permissions.clone(),
        })
    }
}

pub fn require_permission(
    user: &AuthenticatedUser,
    permission: ApiPermission,
) -> Result<(), ForbiddenError> {
    if user.can(permission) {
        return Ok(());
    }
    log::warn!("API key {} lacks {} permission", user.name, permission);
    Err(ForbiddenError {
        required: permission,
    })
}
