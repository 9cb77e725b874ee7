//! Remote run domain types
//!
//! State mirrored from an external CI system by the remote poller. The
//! external system is authoritative; these values are only the poller's
//! latest observation of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of the remote poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    #[default]
    Idle,
    Polling,
    Stopped,
}

impl std::fmt::Display for PollerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollerState::Idle => write!(f, "idle"),
            PollerState::Polling => write!(f, "polling"),
            PollerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Status of a remote run as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteRunStatus {
    /// No active run was found
    #[default]
    None,
    Queued,
    InProgress,
}

impl RemoteRunStatus {
    /// Active states in the order the poller queries them
    pub const ACTIVE: [RemoteRunStatus; 2] = [RemoteRunStatus::InProgress, RemoteRunStatus::Queued];

    /// Query value understood by the remote run-status API
    pub fn as_query(self) -> &'static str {
        match self {
            RemoteRunStatus::None => "none",
            RemoteRunStatus::Queued => "queued",
            RemoteRunStatus::InProgress => "in_progress",
        }
    }
}

impl std::fmt::Display for RemoteRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}

/// A run observed in one of the active states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRun {
    /// Newest run in this state; absent if the API only reported a count
    pub run_id: Option<u64>,
    pub status: RemoteRunStatus,
}

/// The poller's mirror of the remote system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRunState {
    pub run_id: Option<u64>,
    pub status: RemoteRunStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub total_checks: u64,
    pub triggered_count: u64,
}

/// Snapshot returned by the poller's status query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerStatus {
    pub state: PollerState,
    pub run: RemoteRunState,
}
