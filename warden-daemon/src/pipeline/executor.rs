//! Workflow executor
//!
//! Drives one job through the fixed pipeline:
//!
//! 1. Clone source (fatal)
//! 2. Provisioning commands (best effort, always succeeds overall)
//! 3. Optional setup script (skipped when absent, failure tolerated)
//! 4. Tunnel: install helper, start tunnel, extract its URL (soft failure)
//! 5. Hold the session open for the configured duration
//!
//! The job's working directory lives exactly as long as [`WorkflowExecutor::run`].

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use warden_core::domain::event::Event;
use warden_core::domain::job::{JobId, StepOutcome, StepResult, StepStatus};

use crate::config::PipelineConfig;
use crate::pipeline::error::WorkflowError;
use crate::pipeline::step::{StepRunner, StepSpec, Watched};
use crate::pipeline::workspace::JobWorkspace;
use crate::service::{CommandRunner, Notifications};

/// A unit of work the scheduler can run under its single-flight guard
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Runs one job to completion
    ///
    /// # Returns
    /// `Ok(true)` on success, `Ok(false)` on a handled failure. An `Err` is
    /// an unexpected failure; the scheduler counts it as a failed run.
    async fn execute(&self, job_id: &JobId) -> anyhow::Result<bool>;
}

/// Everything a successful job produced
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: JobId,
    /// Steps in execution order
    pub steps: Vec<StepResult>,
    pub tunnel_url: Option<String>,
}

pub struct WorkflowExecutor {
    config: PipelineConfig,
    runner: Arc<dyn CommandRunner>,
    notifications: Notifications,
    url_pattern: Regex,
}

impl WorkflowExecutor {
    pub fn new(
        config: PipelineConfig,
        runner: Arc<dyn CommandRunner>,
        notifications: Notifications,
    ) -> anyhow::Result<Self> {
        let url_pattern =
            Regex::new(&config.tunnel_url_pattern).context("Invalid tunnel URL pattern")?;

        Ok(Self {
            config,
            runner,
            notifications,
            url_pattern,
        })
    }

    /// Runs the pipeline inside a fresh working directory
    ///
    /// Emits step notifications but not the start/end lifecycle events.
    pub async fn run(&self, job_id: &JobId) -> Result<JobReport, WorkflowError> {
        let workspace = JobWorkspace::create(&self.config.work_dir, job_id).await?;
        let result = self.run_steps(job_id, workspace.path()).await;
        workspace.remove().await;
        result
    }

    async fn run_steps(
        &self,
        job_id: &JobId,
        workspace: &Path,
    ) -> Result<JobReport, WorkflowError> {
        let steps = StepRunner::new(job_id, self.runner.as_ref(), &self.notifications);

        let mut report = JobReport {
            job_id: job_id.clone(),
            steps: Vec::new(),
            tunnel_url: None,
        };

        let source_dir = self.clone_source(&steps, workspace, &mut report).await?;
        self.provision(&steps, &source_dir, &mut report).await?;
        self.run_setup_script(&steps, &source_dir, &mut report).await?;

        // The tunnel process lives until the hold is over
        let tunnel = self.open_tunnel(&steps, &source_dir, &mut report).await?;
        report.tunnel_url = tunnel.as_ref().map(|t| t.found.clone());
        self.hold(&steps, &mut report).await;
        drop(tunnel);

        Ok(report)
    }

    /// Clones the repository into the workspace and returns the clone path
    async fn clone_source(
        &self,
        steps: &StepRunner<'_>,
        workspace: &Path,
        report: &mut JobReport,
    ) -> Result<PathBuf, WorkflowError> {
        let repo_name = self.config.repo_name();
        let spec = StepSpec::fatal(
            "Cloning Repository",
            format!("git clone {} {}", self.config.repo_url, repo_name),
            self.config.timeouts.clone,
        );

        let result = spec.enforce(steps.run(&spec, workspace).await)?;
        report.steps.push(result);

        Ok(workspace.join(repo_name))
    }

    async fn provision(
        &self,
        steps: &StepRunner<'_>,
        dir: &Path,
        report: &mut JobReport,
    ) -> Result<(), WorkflowError> {
        let total = self.config.provisioning_commands.len();

        for (idx, command) in self.config.provisioning_commands.iter().enumerate() {
            let spec = StepSpec::best_effort(
                format!("Installing Cloudflare (Step {}/{})", idx + 1, total),
                command.clone(),
                self.config.timeouts.provisioning,
            );
            let result = spec.enforce(steps.run(&spec, dir).await)?;
            report.steps.push(result);
        }

        Ok(())
    }

    async fn run_setup_script(
        &self,
        steps: &StepRunner<'_>,
        dir: &Path,
        report: &mut JobReport,
    ) -> Result<(), WorkflowError> {
        let script_name = &self.config.setup_script;
        let name = format!("Running {}", script_name);
        let script = dir.join(script_name);

        if !script.is_file() {
            warn!("{} not found at {}", script_name, script.display());
            report.steps.push(steps.skip(&name, "not found"));
            return Ok(());
        }

        if let Err(e) = make_executable(&script) {
            error!("Failed to make {} executable: {}", script.display(), e);
            steps.notify(&name, StepStatus::error(&e.to_string()));
            report
                .steps
                .push(StepResult::new(name, StepOutcome::Error, e.to_string()));
            return Ok(());
        }

        let spec = StepSpec::best_effort(
            name,
            format!("./{}", script_name),
            self.config.timeouts.setup_script,
        );
        let result = spec.enforce(steps.run(&spec, dir).await)?;
        report.steps.push(result);

        Ok(())
    }

    /// Starts the tunnel and waits for its URL
    async fn open_tunnel(
        &self,
        steps: &StepRunner<'_>,
        dir: &Path,
        report: &mut JobReport,
    ) -> Result<Option<Watched>, WorkflowError> {
        let install = StepSpec::best_effort(
            "Installing tunnel helper",
            self.config.tunnel_install_command.clone(),
            self.config.timeouts.tunnel_install,
        );
        let result = install.enforce(steps.run(&install, dir).await)?;
        report.steps.push(result);

        let start = StepSpec::best_effort(
            "Starting tunnel",
            self.config.tunnel_command.clone(),
            self.config.timeouts.tunnel_start,
        );
        let (result, tunnel) = steps.watch(&start, dir, &self.url_pattern).await;
        report.steps.push(start.enforce(result)?);

        match &tunnel {
            Some(tunnel) => {
                info!("Tunnel URL: {}", tunnel.found);
                steps.notify_event(Event::TunnelUrl {
                    job_id: report.job_id.clone(),
                    url: tunnel.found.clone(),
                });
            }
            None => warn!("Failed to get tunnel URL"),
        }

        Ok(tunnel)
    }

    /// Keeps the job active for the hold duration
    async fn hold(&self, steps: &StepRunner<'_>, report: &mut JobReport) {
        let hours = self.config.hold_hours();
        let name = format!("Workflow Active (will run for {} hours)", hours);

        info!("Workflow will run for {} hours", hours);
        steps.notify(&name, StepStatus::Running);

        tokio::time::sleep(self.config.hold_duration).await;

        report
            .steps
            .push(StepResult::new(name, StepOutcome::Success, ""));
    }
}

#[async_trait]
impl Workflow for WorkflowExecutor {
    async fn execute(&self, job_id: &JobId) -> anyhow::Result<bool> {
        info!("Starting workflow: {}", job_id);
        self.notifications.notify(Event::WorkflowStarted {
            job_id: job_id.clone(),
        });

        match self.run(job_id).await {
            Ok(report) => {
                info!(
                    "Workflow {} completed successfully ({} steps)",
                    job_id,
                    report.steps.len()
                );
                self.notifications.notify(Event::WorkflowEnded {
                    job_id: job_id.clone(),
                    success: true,
                });
                Ok(true)
            }
            Err(e) => {
                error!("Workflow {} failed: {}", job_id, e);
                self.notifications.notify(Event::Error {
                    job_id: job_id.clone(),
                    message: e.to_string(),
                });
                self.notifications.notify(Event::WorkflowEnded {
                    job_id: job_id.clone(),
                    success: false,
                });
                Ok(false)
            }
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepTimeouts;
    use crate::service::{CommandOutcome, ShellCommandRunner};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};
    use tokio::sync::mpsc::UnboundedReceiver;

    type Rule = Box<dyn Fn(&str, &Path) -> CommandOutcome + Send + Sync>;

    /// Command runner that answers from a rule and records every call
    struct FakeRunner {
        rule: Rule,
        calls: Mutex<Vec<(String, PathBuf)>>,
    }

    impl FakeRunner {
        fn new(rule: impl Fn(&str, &Path) -> CommandOutcome + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                rule: Box::new(rule),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn commands(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(cmd, _)| cmd.clone())
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            command: &str,
            working_dir: &Path,
            _timeout: Duration,
        ) -> std::io::Result<CommandOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), working_dir.to_path_buf()));
            Ok((self.rule)(command, working_dir))
        }
    }

    fn ok(stdout: &str) -> CommandOutcome {
        CommandOutcome::Exited {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn failed(stderr: &str) -> CommandOutcome {
        CommandOutcome::Exited {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Simulates `git clone` by creating the clone directory
    fn clone_into(dir: &Path, command: &str) -> CommandOutcome {
        let target = command.rsplit(' ').next().unwrap();
        std::fs::create_dir_all(dir.join(target)).unwrap();
        ok("")
    }

    fn job_id() -> JobId {
        JobId::at(chrono::DateTime::from_timestamp(1_704_067_200, 0).unwrap())
    }

    fn pipeline_config(base: &TempDir) -> PipelineConfig {
        PipelineConfig {
            work_dir: base.path().to_path_buf(),
            repo_url: "https://github.com/example/project.git".to_string(),
            provisioning_commands: vec!["prov-1".to_string(), "prov-2".to_string()],
            tunnel_install_command: "install-tunnel".to_string(),
            tunnel_command: "start-tunnel".to_string(),
            hold_duration: Duration::ZERO,
            ..PipelineConfig::default()
        }
    }

    fn executor(
        config: PipelineConfig,
        runner: Arc<FakeRunner>,
    ) -> (WorkflowExecutor, UnboundedReceiver<Event>) {
        let (notifications, rx) = Notifications::channel();
        let executor = WorkflowExecutor::new(config, runner, notifications).unwrap();
        (executor, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn step_status(events: &[Event], name: &str) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Step { step, status, .. } if step == name => Some(status.to_string()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_happy_path_without_script_or_url() {
        let base = tempdir().unwrap();
        let runner = FakeRunner::new(|command, dir| match command {
            c if c.starts_with("git clone") => clone_into(dir, c),
            "start-tunnel" => ok("tunnel ready, no link printed"),
            _ => ok(""),
        });
        let (executor, mut rx) = executor(pipeline_config(&base), runner.clone());

        let success = executor.execute(&job_id()).await.unwrap();
        assert!(success);

        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(Event::WorkflowStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(Event::WorkflowEnded { success: true, .. })
        ));
        assert_eq!(
            step_status(&events, "Running install.sh"),
            vec!["Skipped (not found)"]
        );
        assert!(!events.iter().any(|e| matches!(e, Event::TunnelUrl { .. })));
        assert!(!base.path().join("WF-20240101-000000").exists());

        assert_eq!(
            runner.commands(),
            vec![
                "git clone https://github.com/example/project.git project",
                "prov-1",
                "prov-2",
                "install-tunnel",
                "start-tunnel",
            ]
        );
    }

    #[tokio::test]
    async fn test_steps_after_clone_run_inside_the_clone() {
        let base = tempdir().unwrap();
        let runner = FakeRunner::new(|command, dir| match command {
            c if c.starts_with("git clone") => clone_into(dir, c),
            _ => ok(""),
        });
        let (executor, _rx) = executor(pipeline_config(&base), runner.clone());

        executor.run(&job_id()).await.unwrap();

        let calls = runner.calls.lock().unwrap();
        let job_dir = base.path().join("WF-20240101-000000");
        assert_eq!(calls[0].1, job_dir);
        assert!(calls[1..].iter().all(|(_, dir)| *dir == job_dir.join("project")));
    }

    #[tokio::test]
    async fn test_clone_failure_aborts_job() {
        let base = tempdir().unwrap();
        let runner = FakeRunner::new(|command, _| match command {
            c if c.starts_with("git clone") => failed("fatal: repository not found"),
            _ => ok(""),
        });
        let (executor, mut rx) = executor(pipeline_config(&base), runner.clone());

        match executor.run(&job_id()).await {
            Err(WorkflowError::HardFailure { step, message }) => {
                assert_eq!(step, "Cloning Repository");
                assert_eq!(message, "fatal: repository not found");
            }
            other => panic!("expected hard failure, got {:?}", other),
        }
        assert_eq!(runner.commands().len(), 1);
        assert!(!base.path().join("WF-20240101-000000").exists());

        drain(&mut rx);
        let success = executor.execute(&job_id()).await.unwrap();
        assert!(!success);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Error { message, .. } if message.contains("repository not found")
        )));
        assert!(matches!(
            events.last(),
            Some(Event::WorkflowEnded { success: false, .. })
        ));
        assert!(!base.path().join("WF-20240101-000000").exists());
    }

    #[tokio::test]
    async fn test_clone_timeout_is_fatal() {
        let base = tempdir().unwrap();
        let runner = FakeRunner::new(|_, _| CommandOutcome::TimedOut);
        let (executor, mut rx) = executor(pipeline_config(&base), runner.clone());

        assert!(matches!(
            executor.run(&job_id()).await,
            Err(WorkflowError::HardFailure { .. })
        ));
        assert_eq!(
            step_status(&drain(&mut rx), "Cloning Repository"),
            vec!["In Progress", "Timeout"]
        );
        assert_eq!(runner.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_best_effort_timeouts_do_not_abort() {
        let base = tempdir().unwrap();
        let runner = FakeRunner::new(|command, dir| match command {
            c if c.starts_with("git clone") => clone_into(dir, c),
            "prov-1" | "install-tunnel" => CommandOutcome::TimedOut,
            "prov-2" => failed("sudo: command not found"),
            _ => ok(""),
        });
        let (executor, mut rx) = executor(pipeline_config(&base), runner.clone());

        let report = executor.run(&job_id()).await.unwrap();

        let outcomes: Vec<StepOutcome> = report.steps.iter().map(|s| s.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                StepOutcome::Success,
                StepOutcome::Timeout,
                StepOutcome::Failure,
                StepOutcome::Skipped,
                StepOutcome::Timeout,
                StepOutcome::Success,
                StepOutcome::Success,
            ]
        );
        assert_eq!(
            step_status(&drain(&mut rx), "Installing Cloudflare (Step 1/2)"),
            vec!["In Progress", "Timeout"]
        );
    }

    #[tokio::test]
    async fn test_setup_script_runs_and_failure_is_tolerated() {
        let base = tempdir().unwrap();
        let runner = FakeRunner::new(|command, dir| match command {
            c if c.starts_with("git clone") => {
                let outcome = clone_into(dir, c);
                std::fs::write(dir.join("project/install.sh"), "#!/bin/sh\nexit 1\n").unwrap();
                outcome
            }
            "./install.sh" => {
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let mode = std::fs::metadata(dir.join("install.sh"))
                        .unwrap()
                        .permissions()
                        .mode();
                    assert_eq!(mode & 0o777, 0o755);
                }
                failed("install failed")
            }
            _ => ok(""),
        });
        let (executor, mut rx) = executor(pipeline_config(&base), runner.clone());

        assert!(executor.execute(&job_id()).await.unwrap());

        assert!(runner.commands().contains(&"./install.sh".to_string()));
        assert!(runner.commands().contains(&"start-tunnel".to_string()));
        assert_eq!(
            step_status(&drain(&mut rx), "Running install.sh"),
            vec!["In Progress", "Failed: install failed"]
        );
    }

    #[tokio::test]
    async fn test_tunnel_url_is_extracted_and_notified() {
        let base = tempdir().unwrap();
        let runner = FakeRunner::new(|command, dir| match command {
            c if c.starts_with("git clone") => clone_into(dir, c),
            "start-tunnel" => ok("https://sshx.io/s/AbC123#k3y\n"),
            _ => ok(""),
        });
        let (executor, mut rx) = executor(pipeline_config(&base), runner);

        let report = executor.run(&job_id()).await.unwrap();

        assert_eq!(
            report.tunnel_url.as_deref(),
            Some("https://sshx.io/s/AbC123#k3y")
        );
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            Event::TunnelUrl { url, .. } if url == "https://sshx.io/s/AbC123#k3y"
        )));
    }

    #[tokio::test]
    async fn test_tunnel_url_from_long_lived_process() {
        let base = tempdir().unwrap();
        let config = PipelineConfig {
            tunnel_install_command: "true".to_string(),
            tunnel_command: "echo starting; echo 'Link: https://sshx.io/s/AbC123#k3y'; sleep 30"
                .to_string(),
            timeouts: StepTimeouts {
                tunnel_start: Duration::from_secs(10),
                ..StepTimeouts::default()
            },
            ..pipeline_config(&base)
        };
        let (notifications, mut rx) = Notifications::channel();
        let executor =
            WorkflowExecutor::new(config, Arc::new(ShellCommandRunner), notifications).unwrap();

        let job_id = job_id();
        let steps = StepRunner::new(&job_id, executor.runner.as_ref(), &executor.notifications);
        let mut report = JobReport {
            job_id: job_id.clone(),
            steps: Vec::new(),
            tunnel_url: None,
        };

        let started = std::time::Instant::now();
        let tunnel = executor
            .open_tunnel(&steps, base.path(), &mut report)
            .await
            .unwrap()
            .expect("tunnel URL");

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(tunnel.found, "https://sshx.io/s/AbC123#k3y");
        assert!(tunnel.process.id().is_some());

        let outcomes: Vec<StepOutcome> = report.steps.iter().map(|s| s.outcome).collect();
        assert_eq!(outcomes, vec![StepOutcome::Success, StepOutcome::Success]);
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            Event::TunnelUrl { url, .. } if url == "https://sshx.io/s/AbC123#k3y"
        )));
    }

    #[tokio::test]
    async fn test_silent_tunnel_times_out_without_aborting() {
        let base = tempdir().unwrap();
        let config = PipelineConfig {
            tunnel_install_command: "true".to_string(),
            tunnel_command: "echo connecting; sleep 30".to_string(),
            timeouts: StepTimeouts {
                tunnel_start: Duration::from_millis(500),
                ..StepTimeouts::default()
            },
            ..pipeline_config(&base)
        };
        let (notifications, mut rx) = Notifications::channel();
        let executor =
            WorkflowExecutor::new(config, Arc::new(ShellCommandRunner), notifications).unwrap();

        let job_id = job_id();
        let steps = StepRunner::new(&job_id, executor.runner.as_ref(), &executor.notifications);
        let mut report = JobReport {
            job_id: job_id.clone(),
            steps: Vec::new(),
            tunnel_url: None,
        };

        let tunnel = executor
            .open_tunnel(&steps, base.path(), &mut report)
            .await
            .unwrap();

        assert!(tunnel.is_none());
        assert_eq!(report.steps[1].outcome, StepOutcome::Timeout);
        assert_eq!(
            step_status(&drain(&mut rx), "Starting tunnel"),
            vec!["In Progress", "Timeout"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_blocks_for_configured_duration() {
        let base = tempdir().unwrap();
        let runner = FakeRunner::new(|command, dir| match command {
            c if c.starts_with("git clone") => clone_into(dir, c),
            _ => ok(""),
        });
        let config = PipelineConfig {
            hold_duration: Duration::from_secs(5 * 3600),
            ..pipeline_config(&base)
        };
        let (executor, mut rx) = executor(config, runner);

        let early =
            tokio::time::timeout(Duration::from_secs(4 * 3600), executor.run(&job_id())).await;
        assert!(early.is_err());

        let report = executor.run(&job_id()).await.unwrap();
        assert_eq!(
            report.steps.last().unwrap().name,
            "Workflow Active (will run for 5 hours)"
        );
        assert!(
            step_status(&drain(&mut rx), "Workflow Active (will run for 5 hours)")
                .contains(&"Running".to_string())
        );
    }

    #[test]
    fn test_rejects_invalid_url_pattern() {
        let base = tempdir().unwrap();
        let config = PipelineConfig {
            tunnel_url_pattern: "([".to_string(),
            ..pipeline_config(&base)
        };
        let (notifications, _rx) = Notifications::channel();
        let runner = FakeRunner::new(|_, _| ok(""));
        assert!(WorkflowExecutor::new(config, runner, notifications).is_err());
    }
}
