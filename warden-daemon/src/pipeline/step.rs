//! Step contract
//!
//! Every command step runs the same way: notify "In Progress", run the
//! command with the step's timeout, classify the result, notify the
//! classified outcome and hand the result back. The caller applies the
//! step's failure policy afterwards with [`StepSpec::enforce`].

use regex::Regex;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use warden_core::domain::event::Event;
use warden_core::domain::job::{JobId, StepOutcome, StepResult, StepStatus};

use crate::pipeline::error::WorkflowError;
use crate::service::{
    BackgroundProcess, CommandOutcome, CommandRunner, Notifications, WatchOutcome,
};

/// A named command together with its timeout and failure policy
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub name: String,
    pub command: String,
    pub timeout: Duration,
    /// When true, any outcome other than success aborts the job
    pub fatal: bool,
}

impl StepSpec {
    /// A step whose failure aborts the job
    pub fn fatal(name: impl Into<String>, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            timeout,
            fatal: true,
        }
    }

    /// A step whose failure is recorded and then ignored
    pub fn best_effort(
        name: impl Into<String>,
        command: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            fatal: false,
            ..Self::fatal(name, command, timeout)
        }
    }

    /// Applies the failure policy to a finished step
    pub fn enforce(&self, result: StepResult) -> Result<StepResult, WorkflowError> {
        if self.fatal && !result.outcome.is_ok() {
            return Err(WorkflowError::HardFailure {
                step: self.name.clone(),
                message: match result.outcome {
                    StepOutcome::Timeout => "command timed out".to_string(),
                    _ => result.output.trim().to_string(),
                },
            });
        }

        if !result.outcome.is_ok() {
            warn!("{} did not succeed ({}), continuing", self.name, result.outcome);
        }

        Ok(result)
    }
}

/// What a watched step left behind when its pattern matched
#[derive(Debug)]
pub struct Watched {
    pub found: String,
    /// Kept alive for as long as the job needs it
    pub process: BackgroundProcess,
}

/// Runs steps for one job, emitting its step notifications
pub struct StepRunner<'a> {
    job_id: &'a JobId,
    runner: &'a dyn CommandRunner,
    notifications: &'a Notifications,
}

impl<'a> StepRunner<'a> {
    pub fn new(
        job_id: &'a JobId,
        runner: &'a dyn CommandRunner,
        notifications: &'a Notifications,
    ) -> Self {
        Self {
            job_id,
            runner,
            notifications,
        }
    }

    /// Runs one step in `working_dir` and classifies its outcome
    pub async fn run(&self, spec: &StepSpec, working_dir: &Path) -> StepResult {
        info!("Running: {}", spec.name);
        self.notify(&spec.name, StepStatus::InProgress);

        let (outcome, output) = match self
            .runner
            .run(&spec.command, working_dir, spec.timeout)
            .await
        {
            Ok(CommandOutcome::Exited {
                success: true,
                stdout,
                ..
            }) => {
                info!("{} completed successfully", spec.name);
                (StepOutcome::Success, stdout)
            }
            Ok(CommandOutcome::Exited { stderr, .. }) => {
                error!("{} failed: {}", spec.name, stderr.trim());
                (StepOutcome::Failure, stderr)
            }
            Ok(CommandOutcome::TimedOut) => {
                error!("{} timed out after {}s", spec.name, spec.timeout.as_secs());
                (StepOutcome::Timeout, "Command timed out".to_string())
            }
            Err(e) => {
                error!("{} error: {}", spec.name, e);
                (StepOutcome::Error, e.to_string())
            }
        };

        self.notify(&spec.name, StepStatus::from_outcome(outcome, &output));
        StepResult::new(spec.name.clone(), outcome, output)
    }

    /// Starts a long-lived step and waits for `pattern` in its output
    ///
    /// The step succeeds when the pattern is found, or when the process
    /// exits cleanly without it; the caller decides what a missing match
    /// means.
    pub async fn watch(
        &self,
        spec: &StepSpec,
        working_dir: &Path,
        pattern: &Regex,
    ) -> (StepResult, Option<Watched>) {
        info!("Running: {}", spec.name);
        self.notify(&spec.name, StepStatus::InProgress);

        let (outcome, output, watched) = match self
            .runner
            .watch(&spec.command, working_dir, pattern, spec.timeout)
            .await
        {
            Ok(WatchOutcome::Matched {
                found,
                output,
                process,
            }) => {
                info!("{} is up", spec.name);
                (StepOutcome::Success, output, Some(Watched { found, process }))
            }
            Ok(WatchOutcome::Exited {
                success: true,
                output,
            }) => {
                info!("{} exited without a match", spec.name);
                (StepOutcome::Success, output, None)
            }
            Ok(WatchOutcome::Exited { output, .. }) => {
                error!("{} failed: {}", spec.name, output.trim());
                (StepOutcome::Failure, output, None)
            }
            Ok(WatchOutcome::TimedOut { output }) => {
                error!("{} timed out after {}s", spec.name, spec.timeout.as_secs());
                debug!("{} output before timeout: {}", spec.name, output.trim());
                (StepOutcome::Timeout, "Command timed out".to_string(), None)
            }
            Err(e) => {
                error!("{} error: {}", spec.name, e);
                (StepOutcome::Error, e.to_string(), None)
            }
        };

        self.notify(&spec.name, StepStatus::from_outcome(outcome, &output));
        (StepResult::new(spec.name.clone(), outcome, output), watched)
    }

    /// Records a step that did not apply, notifying the reason
    pub fn skip(&self, name: &str, reason: &str) -> StepResult {
        self.notify(name, StepStatus::Skipped(reason.to_string()));
        StepResult::new(name, StepOutcome::Skipped, reason)
    }

    pub fn notify(&self, step: &str, status: StepStatus) {
        self.notifications.notify(Event::Step {
            job_id: self.job_id.clone(),
            step: step.to_string(),
            status,
        });
    }

    pub fn notify_event(&self, event: Event) {
        self.notifications.notify(event);
    }
}
