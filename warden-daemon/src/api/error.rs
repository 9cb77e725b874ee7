//! API Error Handling
//!
//! Maps scheduler and poller rejections onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use warden_core::domain::job::JobId;
use warden_core::dto::status::TriggerConflict;

use crate::scheduler::{PollerError, SchedulerError};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// A workflow is in flight
    AlreadyRunning(Option<JobId>),
    Conflict(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::AlreadyRunning(current_workflow) => {
                let body = TriggerConflict {
                    error: "Workflow already running".to_string(),
                    current_workflow,
                };
                return (StatusCode::CONFLICT, Json(body)).into_response();
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::AlreadyRunning { current_job_id } => {
                ApiError::AlreadyRunning(current_job_id)
            }
        }
    }
}

impl From<PollerError> for ApiError {
    fn from(err: PollerError) -> Self {
        match err {
            PollerError::AlreadyMonitoring | PollerError::NotMonitoring => {
                ApiError::Conflict(err.to_string())
            }
            PollerError::MissingConfiguration(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
