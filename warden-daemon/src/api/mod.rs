//! API Module
//!
//! Thin HTTP surface over the scheduler and the remote poller.

pub mod error;
pub mod health;
pub mod poller;
pub mod status;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::scheduler::{JobScheduler, RemotePoller};

/// Handles shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub scheduler: JobScheduler,
    pub poller: RemotePoller,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status::index))
        .route("/health", get(health::health_check))
        // Workflow endpoints
        .route("/status", get(status::get_status))
        .route("/trigger", post(status::trigger))
        .route("/logs", get(status::get_logs))
        // Poller endpoints
        .route("/poller/status", get(poller::get_status))
        .route("/poller/start", post(poller::start))
        .route("/poller/stop", post(poller::stop))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
