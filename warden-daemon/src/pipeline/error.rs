//! Workflow errors

use thiserror::Error;

/// Errors that end a workflow execution early
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A fatal step did not succeed; no further steps ran
    #[error("Step '{step}' failed: {message}")]
    HardFailure { step: String, message: String },

    /// The job's working directory could not be prepared
    #[error("Failed to prepare working directory: {0}")]
    Workspace(#[from] std::io::Error),
}
