//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a single workflow execution, formatted `WF-<UTC timestamp>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Mints an identifier from the current UTC time
    pub fn generate() -> Self {
        Self::at(Utc::now())
    }

    /// Mints the identifier for a given instant
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(format!("WF-{}", instant.format("%Y%m%d-%H%M%S")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classified outcome of one pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Command exited zero
    Success,
    /// Command exited nonzero
    Failure,
    /// Command exceeded its step timeout
    Timeout,
    /// Command could not be run at all
    Error,
    /// Step was not applicable (e.g. optional script absent)
    Skipped,
}

impl StepOutcome {
    /// Whether this outcome counts as the step having done its job
    pub fn is_ok(self) -> bool {
        matches!(self, StepOutcome::Success | StepOutcome::Skipped)
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOutcome::Success => write!(f, "Success"),
            StepOutcome::Failure => write!(f, "Failure"),
            StepOutcome::Timeout => write!(f, "Timeout"),
            StepOutcome::Error => write!(f, "Error"),
            StepOutcome::Skipped => write!(f, "Skipped"),
        }
    }
}

/// Record of one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub outcome: StepOutcome,
    /// stdout on success, stderr or error text otherwise
    pub output: String,
}

impl StepResult {
    pub fn new(name: impl Into<String>, outcome: StepOutcome, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome,
            output: output.into(),
        }
    }
}

/// Maximum number of characters of error detail carried in a step notification
pub const STEP_DETAIL_LIMIT: usize = 100;

/// Human-readable status attached to a step notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    InProgress,
    Success,
    Failed(String),
    Timeout,
    Error(String),
    Skipped(String),
    Running,
}

impl StepStatus {
    /// Builds a `Failed` status, truncating the detail for display
    pub fn failed(detail: &str) -> Self {
        StepStatus::Failed(truncate_chars(detail, STEP_DETAIL_LIMIT))
    }

    /// Builds an `Error` status, truncating the detail for display
    pub fn error(detail: &str) -> Self {
        StepStatus::Error(truncate_chars(detail, STEP_DETAIL_LIMIT))
    }

    /// Maps a classified outcome and its captured text to a notification status
    pub fn from_outcome(outcome: StepOutcome, output: &str) -> Self {
        match outcome {
            StepOutcome::Success => StepStatus::Success,
            StepOutcome::Failure => StepStatus::failed(output),
            StepOutcome::Timeout => StepStatus::Timeout,
            StepOutcome::Error => StepStatus::error(output),
            StepOutcome::Skipped => StepStatus::Skipped(output.to_string()),
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::InProgress => write!(f, "In Progress"),
            StepStatus::Success => write!(f, "Success"),
            StepStatus::Failed(detail) => write!(f, "Failed: {}", detail),
            StepStatus::Timeout => write!(f, "Timeout"),
            StepStatus::Error(detail) => write!(f, "Error: {}", detail),
            StepStatus::Skipped(reason) => write!(f, "Skipped ({})", reason),
            StepStatus::Running => write!(f, "Running"),
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
