//! Job scheduler
//!
//! Guarantees at most one workflow execution at a time. A trigger claims the
//! slot inside a short critical section (check `is_running`, set it, count
//! the run); the workflow itself runs in its own task outside the lock, and
//! the slot is released in a second critical section when it ends. Status
//! reads take the same lock and return a copy.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use warden_core::domain::job::JobId;
use warden_core::domain::status::JobStatus;

use crate::pipeline::Workflow;

/// Rejection of a trigger
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Workflow already running")]
    AlreadyRunning { current_job_id: Option<JobId> },
}

/// Where a trigger came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Manual,
    Periodic,
    Startup,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Manual => write!(f, "manual"),
            TriggerSource::Periodic => write!(f, "periodic"),
            TriggerSource::Startup => write!(f, "startup"),
        }
    }
}

#[derive(Clone)]
pub struct JobScheduler {
    status: Arc<Mutex<JobStatus>>,
    workflow: Arc<dyn Workflow>,
}

impl JobScheduler {
    pub fn new(workflow: Arc<dyn Workflow>) -> Self {
        Self {
            status: Arc::new(Mutex::new(JobStatus::default())),
            workflow,
        }
    }

    /// Starts a job on operator request
    ///
    /// Returns immediately with the new job's id, or `AlreadyRunning` with
    /// the id of the job in flight.
    pub fn trigger_manual(&self) -> Result<JobId, SchedulerError> {
        self.start(TriggerSource::Manual).map(|(job_id, _)| job_id)
    }

    /// Starts a job from the interval timer, skipping if one is in flight
    pub fn trigger_periodic(&self) -> Option<JobId> {
        self.start_or_skip(TriggerSource::Periodic)
    }

    /// Starts the boot-time job, skipping if one is in flight
    pub fn trigger_on_startup(&self) -> Option<JobId> {
        self.start_or_skip(TriggerSource::Startup)
    }

    /// Snapshot of the current status
    pub fn status(&self) -> JobStatus {
        self.lock().clone()
    }

    /// Records when the periodic timer fires next
    pub fn set_next_run_time(&self, at: Option<chrono::DateTime<Utc>>) {
        self.lock().next_run_time = at;
    }

    fn start_or_skip(&self, source: TriggerSource) -> Option<JobId> {
        match self.start(source) {
            Ok((job_id, _)) => Some(job_id),
            Err(SchedulerError::AlreadyRunning { current_job_id }) => {
                warn!(
                    "Workflow already running ({}), skipping {} trigger",
                    current_job_id
                        .as_ref()
                        .map(JobId::as_str)
                        .unwrap_or("pending"),
                    source
                );
                None
            }
        }
    }

    /// Claims the slot and spawns the job
    fn start(&self, source: TriggerSource) -> Result<(JobId, JoinHandle<()>), SchedulerError> {
        let job_id = self.claim()?;
        info!("Starting {} workflow: {}", source, job_id);

        let scheduler = self.clone();
        let id = job_id.clone();
        let handle = tokio::spawn(async move { scheduler.run_claimed(id).await });

        Ok((job_id, handle))
    }

    fn claim(&self) -> Result<JobId, SchedulerError> {
        let mut status = self.lock();

        if status.is_running {
            return Err(SchedulerError::AlreadyRunning {
                current_job_id: status.current_job_id.clone(),
            });
        }

        let job_id = JobId::generate();
        status.is_running = true;
        status.current_job_id = Some(job_id.clone());
        status.total_runs += 1;

        Ok(job_id)
    }

    /// Runs a claimed job and releases the slot whatever happens
    async fn run_claimed(self, job_id: JobId) {
        let workflow = Arc::clone(&self.workflow);
        let id = job_id.clone();

        // A nested task turns a panic in the workflow into a JoinError
        let success = match tokio::spawn(async move { workflow.execute(&id).await }).await {
            Ok(Ok(success)) => success,
            Ok(Err(e)) => {
                error!("Error running workflow {}: {:#}", job_id, e);
                false
            }
            Err(e) => {
                error!("Workflow task {} panicked: {}", job_id, e);
                false
            }
        };

        self.finish(&job_id, success);
        info!("Workflow {} finished. Success: {}", job_id, success);
    }

    fn finish(&self, job_id: &JobId, success: bool) {
        let mut status = self.lock();

        status.is_running = false;
        status.current_job_id = None;
        status.last_job_id = Some(job_id.clone());
        status.last_run_time = Some(Utc::now());
        if success {
            status.successful_runs += 1;
        } else {
            status.failed_runs += 1;
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
