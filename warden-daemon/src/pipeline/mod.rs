//! Workflow pipeline
//!
//! One workflow execution owns a fresh working directory and runs a fixed,
//! ordered list of steps in it. Each step follows the same contract (see
//! [`step`]); whether a failed step aborts the job is decided by the step's
//! `fatal` flag, not by the step itself.

pub mod error;
pub mod executor;
pub mod step;
pub mod workspace;

pub use executor::{Workflow, WorkflowExecutor};
