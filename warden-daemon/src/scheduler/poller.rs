//! Remote poller
//!
//! Keeps one run of a remote CI workflow alive. While polling, each cycle
//! asks the remote API for a run in an active state (in progress first, then
//! queued) and dispatches a new run only when neither exists.
//!
//! `stop()` only prevents future cycles: a sleep already in flight finishes
//! first. Each `start()` bumps a generation counter so a loop left over from
//! an earlier start exits instead of running alongside the new one. The
//! generation is checked again right before dispatching, since a stale loop
//! may have been mid-query when the restart happened.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use warden_client::RemoteTarget;
use warden_core::domain::remote::{
    ActiveRun, PollerState, PollerStatus, RemoteRunState, RemoteRunStatus,
};

use crate::config::PollerConfig;
use crate::service::RemoteRuns;

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("Already monitoring")]
    AlreadyMonitoring,

    #[error("Not monitoring")]
    NotMonitoring,

    #[error("Missing remote configuration: {}", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),
}

/// What the poller watches and how often
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub target: RemoteTarget,
    pub poll_interval: Duration,
    /// Pause after a dispatch so the new run shows up in the next query
    pub dispatch_settle: Duration,
}

impl From<&PollerConfig> for PollerSettings {
    fn from(config: &PollerConfig) -> Self {
        Self {
            target: config.target.clone(),
            poll_interval: config.poll_interval,
            dispatch_settle: config.dispatch_settle,
        }
    }
}

#[derive(Debug, Default)]
struct PollerInner {
    state: PollerState,
    run: RemoteRunState,
    generation: u64,
}

/// Result of a single poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    Observed(ActiveRun),
    Dispatched,
    Rejected,
}

#[derive(Clone)]
pub struct RemotePoller {
    inner: Arc<Mutex<PollerInner>>,
    remote: Arc<dyn RemoteRuns>,
    settings: Arc<PollerSettings>,
}

impl RemotePoller {
    pub fn new(remote: Arc<dyn RemoteRuns>, settings: PollerSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PollerInner::default())),
            remote,
            settings: Arc::new(settings),
        }
    }

    /// Starts polling in a background task
    pub fn start(&self) -> Result<JoinHandle<()>, PollerError> {
        let missing = self.settings.target.missing_fields();
        if !missing.is_empty() {
            return Err(PollerError::MissingConfiguration(missing));
        }

        let generation = {
            let mut inner = self.lock();
            if inner.state == PollerState::Polling {
                return Err(PollerError::AlreadyMonitoring);
            }
            inner.state = PollerState::Polling;
            inner.generation += 1;
            inner.generation
        };

        info!(
            "Polling {}/{} workflow {} every {}s",
            self.settings.target.owner,
            self.settings.target.repo,
            self.settings.target.workflow,
            self.settings.poll_interval.as_secs()
        );

        let poller = self.clone();
        Ok(tokio::spawn(async move { poller.run(generation).await }))
    }

    pub fn stop(&self) -> Result<(), PollerError> {
        let mut inner = self.lock();
        if inner.state != PollerState::Polling {
            return Err(PollerError::NotMonitoring);
        }
        inner.state = PollerState::Stopped;
        info!("Poller stopped");
        Ok(())
    }

    pub fn status(&self) -> PollerStatus {
        let inner = self.lock();
        PollerStatus {
            state: inner.state,
            run: inner.run.clone(),
        }
    }

    async fn run(self, generation: u64) {
        while self.is_current(generation) {
            let cycle = match self.poll_once(generation).await {
                Ok(Some(cycle)) => cycle,
                Ok(None) => break,
                Err(e) => {
                    error!("Polling error, stopping poller: {:#}", e);
                    self.halt(generation);
                    return;
                }
            };

            if !self.record(generation, cycle) {
                return;
            }

            if cycle == Cycle::Dispatched {
                tokio::time::sleep(self.settings.dispatch_settle).await;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
        debug!("Poll loop {} exited", generation);
    }

    /// Runs one query/dispatch cycle; `None` if this loop went stale before
    /// it could dispatch
    async fn poll_once(&self, generation: u64) -> anyhow::Result<Option<Cycle>> {
        let target = &self.settings.target;

        for status in RemoteRunStatus::ACTIVE {
            if let Some(run) = self.remote.find_run(target, status).await? {
                info!(
                    "Workflow run {} is {}, not dispatching",
                    run.run_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                    status
                );
                return Ok(Some(Cycle::Observed(run)));
            }
        }

        if !self.is_current(generation) {
            return Ok(None);
        }

        info!("No active workflow run, dispatching {}", target.workflow);
        if self.remote.dispatch(target).await? {
            Ok(Some(Cycle::Dispatched))
        } else {
            warn!("Dispatch was not accepted, retrying next cycle");
            Ok(Some(Cycle::Rejected))
        }
    }

    /// Folds a cycle into the mirrored state; false if this loop is stale
    fn record(&self, generation: u64, cycle: Cycle) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != PollerState::Polling {
            return false;
        }

        let run = &mut inner.run;
        run.total_checks += 1;
        run.last_checked_at = Some(Utc::now());
        match cycle {
            Cycle::Observed(active) => {
                run.run_id = active.run_id;
                run.status = active.status;
            }
            Cycle::Dispatched => {
                run.run_id = None;
                run.status = RemoteRunStatus::None;
                run.triggered_count += 1;
            }
            Cycle::Rejected => {
                run.run_id = None;
                run.status = RemoteRunStatus::None;
            }
        }
        true
    }

    fn halt(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.state = PollerState::Stopped;
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let inner = self.lock();
        inner.generation == generation && inner.state == PollerState::Polling
    }

    fn lock(&self) -> MutexGuard<'_, PollerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
