//! Poller API Handlers

use axum::{Json, extract::State, http::StatusCode};
use warden_core::domain::remote::PollerStatus;
use warden_core::dto::status::PollerAck;

use crate::api::AppState;
use crate::api::error::ApiResult;

/// GET /poller/status
pub async fn get_status(State(state): State<AppState>) -> Json<PollerStatus> {
    Json(state.poller.status())
}

/// POST /poller/start
pub async fn start(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<PollerAck>)> {
    state.poller.start()?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PollerAck {
            message: "Monitoring started".to_string(),
        }),
    ))
}

/// POST /poller/stop
pub async fn stop(State(state): State<AppState>) -> ApiResult<Json<PollerAck>> {
    state.poller.stop()?;

    Ok(Json(PollerAck {
        message: "Monitoring stopped".to_string(),
    }))
}
