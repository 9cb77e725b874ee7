//! Health Check API Handler

use axum::Json;
use warden_core::dto::status::HealthResponse;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
