//! Command execution service
//!
//! Runs a shell command in a working directory with a hard timeout and
//! captures its output. A command that outlives its timeout is killed.
//!
//! Long-lived commands (the tunnel) are watched instead: their merged output
//! is read line by line until a pattern matches, and the process is then left
//! running behind a [`BackgroundProcess`] handle.

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of a command that was started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Exited {
        success: bool,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

/// Result of watching a long-lived command for a pattern
#[derive(Debug)]
pub enum WatchOutcome {
    /// The pattern appeared; the process is still running
    Matched {
        found: String,
        output: String,
        process: BackgroundProcess,
    },
    /// The process ended without printing the pattern
    Exited { success: bool, output: String },
    /// Nothing matched in time; the process was killed
    TimedOut { output: String },
}

/// Service trait for running shell commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` through the shell inside `working_dir`
    ///
    /// # Returns
    /// The command outcome, or an I/O error if it could not be started
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> std::io::Result<CommandOutcome>;

    /// Starts `command` and waits up to `timeout` for `pattern` in its output
    ///
    /// The default runs the command to completion and scans what it printed,
    /// which suits commands that exit on their own.
    async fn watch(
        &self,
        command: &str,
        working_dir: &Path,
        pattern: &Regex,
        timeout: Duration,
    ) -> std::io::Result<WatchOutcome> {
        let outcome = match self.run(command, working_dir, timeout).await? {
            CommandOutcome::Exited {
                success,
                stdout,
                stderr,
            } => {
                let output = format!("{}{}", stdout, stderr);
                match pattern.find(&output).map(|m| m.as_str().to_string()) {
                    Some(found) => WatchOutcome::Matched {
                        found,
                        output,
                        process: BackgroundProcess::detached(),
                    },
                    None => WatchOutcome::Exited { success, output },
                }
            }
            CommandOutcome::TimedOut => WatchOutcome::TimedOut {
                output: String::new(),
            },
        };
        Ok(outcome)
    }
}

/// A process left running by [`CommandRunner::watch`]
///
/// Dropping the handle kills the process and everything it spawned.
#[derive(Debug, Default)]
pub struct BackgroundProcess {
    child: Option<Child>,
    drain: Option<JoinHandle<()>>,
}

impl BackgroundProcess {
    /// A handle with no process behind it
    pub fn detached() -> Self {
        Self::default()
    }

    fn spawned(child: Child) -> Self {
        Self {
            child: Some(child),
            drain: None,
        }
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Keeps reading output so the process never blocks on a full pipe
    fn drain(&mut self, mut lines: Lines<BufReader<ChildStdout>>) {
        self.drain = Some(tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(line = %line, "Background process output");
            }
        }));
    }

    async fn wait(&mut self) -> std::io::Result<bool> {
        match self.child.as_mut() {
            Some(child) => Ok(child.wait().await?.success()),
            None => Ok(true),
        }
    }

    fn kill(&mut self) {
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
        let Some(mut child) = self.child.take() else {
            return;
        };

        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                // The shell leads its own group; a negative pid signals all of it
                unsafe {
                    libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
                }
            }
        }
        if let Err(e) = child.start_kill() {
            debug!("Background process already gone: {}", e);
        }
    }
}

impl Drop for BackgroundProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Runs commands with `sh -c`
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellCommandRunner;

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> std::io::Result<CommandOutcome> {
        debug!(cmd = %command, dir = %working_dir.display(), "Running command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                Ok(CommandOutcome::Exited {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Err(_) => {
                warn!(cmd = %command, timeout_secs = timeout.as_secs(), "Command timed out");
                Ok(CommandOutcome::TimedOut)
            }
        }
    }

    async fn watch(
        &self,
        command: &str,
        working_dir: &Path,
        pattern: &Regex,
        timeout: Duration,
    ) -> std::io::Result<WatchOutcome> {
        debug!(cmd = %command, dir = %working_dir.display(), "Watching command");
        let deadline = Instant::now() + timeout;

        // stderr is folded into stdout so one reader sees everything
        let mut builder = Command::new("sh");
        builder
            .arg("-c")
            .arg(format!("exec 2>&1\n{}", command))
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        builder.process_group(0);

        let mut child = builder.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout was not captured"))?;
        let mut process = BackgroundProcess::spawned(child);
        let mut lines = BufReader::new(stdout).lines();
        let mut output = String::new();

        let scan = async {
            while let Some(line) = lines.next_line().await? {
                output.push_str(&line);
                output.push('\n');
                if let Some(m) = pattern.find(&line) {
                    return Ok::<_, std::io::Error>(Some(m.as_str().to_string()));
                }
            }
            Ok(None)
        };

        let scanned = tokio::time::timeout_at(deadline, scan).await;
        match scanned {
            Ok(Ok(Some(found))) => {
                process.drain(lines);
                Ok(WatchOutcome::Matched {
                    found,
                    output,
                    process,
                })
            }
            Ok(Ok(None)) => match tokio::time::timeout_at(deadline, process.wait()).await {
                Ok(success) => Ok(WatchOutcome::Exited {
                    success: success?,
                    output,
                }),
                Err(_) => Ok(WatchOutcome::TimedOut { output }),
            },
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(cmd = %command, timeout_secs = timeout.as_secs(), "No match before timeout");
                Ok(WatchOutcome::TimedOut { output })
            }
        }
    }
}
