//! Client for the daemon's status API

use reqwest::{Client, StatusCode};
use warden_core::domain::remote::PollerStatus;
use warden_core::domain::status::JobStatus;
use warden_core::dto::status::{PollerAck, TriggerAccepted, TriggerConflict};

use crate::error::{ClientError, Result};
use crate::http::{handle_response, trim_base_url};

/// HTTP client for a running warden daemon
#[derive(Debug, Clone)]
pub struct WardenClient {
    /// Base URL of the daemon (e.g., "http://localhost:10000")
    base_url: String,
    client: Client,
}

/// Result of a manual trigger request
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    Accepted(TriggerAccepted),
    /// A job was already running; nothing was started
    Conflict(TriggerConflict),
}

impl WardenClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            client: Client::new(),
        }
    }

    /// Get the base URL of the daemon
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Scheduler
    // =============================================================================

    /// Fetch a snapshot of the scheduler status
    pub async fn status(&self) -> Result<JobStatus> {
        let url = format!("{}/status", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Request a manual workflow run
    ///
    /// A 409 is not an error here: it is reported as [`TriggerOutcome::Conflict`].
    pub async fn trigger(&self) -> Result<TriggerOutcome> {
        let url = format!("{}/trigger", self.base_url);
        let response = self.client.post(&url).send().await?;

        if response.status() == StatusCode::CONFLICT {
            let conflict = response.json().await.map_err(|e| {
                ClientError::ParseError(format!("Failed to parse conflict body: {}", e))
            })?;
            return Ok(TriggerOutcome::Conflict(conflict));
        }

        handle_response(response).await.map(TriggerOutcome::Accepted)
    }

    // =============================================================================
    // Remote poller
    // =============================================================================

    pub async fn poller_status(&self) -> Result<PollerStatus> {
        let url = format!("{}/poller/status", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    pub async fn start_poller(&self) -> Result<PollerAck> {
        let url = format!("{}/poller/start", self.base_url);
        let response = self.client.post(&url).send().await?;

        handle_response(response).await
    }

    pub async fn stop_poller(&self) -> Result<PollerAck> {
        let url = format!("{}/poller/stop", self.base_url);
        let response = self.client.post(&url).send().await?;

        handle_response(response).await
    }
}
