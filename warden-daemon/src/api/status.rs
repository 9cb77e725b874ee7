//! Workflow API Handlers
//!
//! Service info, the scheduler snapshot and the manual trigger.

use axum::{Json, extract::State, http::StatusCode};
use warden_core::domain::status::JobStatus;
use warden_core::dto::status::{LogsPointer, ServiceInfo, TriggerAccepted};

use crate::api::AppState;
use crate::api::error::ApiResult;

pub const SERVICE_NAME: &str = "VPS Workflow Automation";

/// GET /
pub async fn index(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "running".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        workflow_status: state.scheduler.status(),
    })
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<JobStatus> {
    Json(state.scheduler.status())
}

/// GET /logs
///
/// Logs go to the tracing subscriber; this only points there.
pub async fn get_logs(State(state): State<AppState>) -> Json<LogsPointer> {
    Json(LogsPointer {
        message: "Check application logs for detailed information".to_string(),
        status: state.scheduler.status(),
    })
}

/// POST /trigger
///
/// Starts a workflow without waiting for it; 409 if one is in flight.
pub async fn trigger(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<TriggerAccepted>)> {
    let workflow_id = state.scheduler.trigger_manual()?;
    tracing::info!("Manual trigger accepted: {}", workflow_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerAccepted {
            message: "Workflow triggered successfully".to_string(),
            workflow_id,
        }),
    ))
}
