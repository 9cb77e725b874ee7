//! Scheduler status
//!
//! Snapshot of the process-wide job counters. The daemon keeps one live
//! instance behind a mutex and hands out clones of this struct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::JobId;

/// Lifecycle counters and identifiers of the single-flight scheduler
///
/// `successful_runs + failed_runs <= total_runs` always holds; the two are
/// equal whenever no job is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Job currently executing, if any
    pub current_job_id: Option<JobId>,

    /// True exactly while a workflow execution is in flight
    pub is_running: bool,

    /// Most recently finished job
    pub last_job_id: Option<JobId>,

    /// When the most recently finished job ended
    pub last_run_time: Option<DateTime<Utc>>,

    /// Next periodic trigger, when the timer is armed
    pub next_run_time: Option<DateTime<Utc>>,

    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
}
