use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::agent::{AgentStatus, PositionFix, PositionUpdate, SessionMode, StartOutcome};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::server::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StartResponse {
    pub outcome: StartOutcome,
    pub session: SessionMode,
}

#[utoipa::path(
    post,
    path = "/api/agent/start",
    responses(
        (status = 200, description = "Start processed (idempotent)", body = StartResponse),
        (status = 503, description = "Positioning subsystem refused the subscription", body = ErrorResponse)
    ),
    tag = "agent"
)]
pub async fn start(State(state): State<AppState>) -> ApiResult<Json<StartResponse>> {
    let mut supervisor = state.supervisor.lock().await;
    let outcome = supervisor.start().await.map_err(ApiError::from)?;

    Ok(Json(StartResponse {
        outcome,
        session: supervisor.status().session,
    }))
}

#[utoipa::path(
    post,
    path = "/api/agent/stop",
    responses(
        (status = 200, description = "Tracking stopped (idempotent)", body = SessionMode)
    ),
    tag = "agent"
)]
pub async fn stop(State(state): State<AppState>) -> Json<SessionMode> {
    let mut supervisor = state.supervisor.lock().await;
    supervisor.stop().await;
    Json(supervisor.status().session)
}

#[utoipa::path(
    get,
    path = "/api/agent/status",
    responses(
        (status = 200, description = "Session mode and latest status projection", body = AgentStatus)
    ),
    tag = "agent"
)]
pub async fn status(State(state): State<AppState>) -> Json<AgentStatus> {
    let supervisor = state.supervisor.lock().await;
    Json(supervisor.status())
}

#[utoipa::path(
    get,
    path = "/api/agent/status/last",
    responses(
        (status = 200, description = "Latest status projection, if any", body = Option<PositionUpdate>)
    ),
    tag = "agent"
)]
pub async fn status_last(State(state): State<AppState>) -> Json<Option<PositionUpdate>> {
    let supervisor = state.supervisor.lock().await;
    Json(supervisor.status().last_update)
}

#[utoipa::path(
    post,
    path = "/api/agent/fix",
    request_body = PositionFix,
    responses(
        (status = 202, description = "Fix handed to the active session"),
        (status = 400, description = "Malformed fix", body = ErrorResponse),
        (status = 409, description = "No active tracking session", body = ErrorResponse)
    ),
    tag = "agent"
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(fix): Json<PositionFix>,
) -> ApiResult<StatusCode> {
    validate_fix(&fix)?;

    if state.source.push(fix) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(ApiError::Conflict("tracking_not_active"))
    }
}

fn validate_fix(fix: &PositionFix) -> Result<(), ApiError> {
    if !fix.latitude.is_finite() || !(-90.0..=90.0).contains(&fix.latitude) {
        return Err(ApiError::Validation("latitude out of range".to_string()));
    }
    if !fix.longitude.is_finite() || !(-180.0..=180.0).contains(&fix.longitude) {
        return Err(ApiError::Validation("longitude out of range".to_string()));
    }
    if !fix.accuracy.is_finite() || fix.accuracy < 0.0 {
        return Err(ApiError::Validation("accuracy must be non-negative".to_string()));
    }
    if !fix.speed.is_finite() || fix.speed < 0.0 {
        return Err(ApiError::Validation("speed must be non-negative".to_string()));
    }
    if let Some(heading) = fix.heading {
        if !heading.is_finite() || !(0.0..=360.0).contains(&heading) {
            return Err(ApiError::Validation("heading out of range".to_string()));
        }
    }
    Ok(())
}
