//! Status API DTOs

use serde::{Deserialize, Serialize};

use crate::domain::job::JobId;
use crate::domain::status::JobStatus;

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub status: String,
    pub service: String,
    pub version: String,
    pub workflow_status: JobStatus,
}

/// Body of `GET /logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsPointer {
    pub message: String,
    pub status: JobStatus,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of an accepted `POST /trigger` (202)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerAccepted {
    pub message: String,
    pub workflow_id: JobId,
}

/// Body of a rejected `POST /trigger` (409)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConflict {
    pub error: String,
    pub current_workflow: Option<JobId>,
}

/// Body of the poller control endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerAck {
    pub message: String,
}
