//! Notification events
//!
//! Lifecycle and step events pushed to the notification sink. Events carry
//! structure only; rendering is up to the sink.

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobId, StepStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    WorkflowStarted {
        job_id: JobId,
    },
    Step {
        job_id: JobId,
        step: String,
        status: StepStatus,
    },
    /// Tunnel exposure URL extracted from the tunnel step
    TunnelUrl {
        job_id: JobId,
        url: String,
    },
    WorkflowEnded {
        job_id: JobId,
        success: bool,
    },
    Error {
        job_id: JobId,
        message: String,
    },
}

impl Event {
    pub fn job_id(&self) -> &JobId {
        match self {
            Event::WorkflowStarted { job_id }
            | Event::Step { job_id, .. }
            | Event::TunnelUrl { job_id, .. }
            | Event::WorkflowEnded { job_id, .. }
            | Event::Error { job_id, .. } => job_id,
        }
    }
}
