//! Remote run service
//!
//! Adapts the GitHub Actions client to the queries the remote poller needs.

use anyhow::Context;
use async_trait::async_trait;
use tracing::warn;
use warden_client::{ClientError, GitHubClient, RemoteTarget};
use warden_core::domain::remote::{ActiveRun, RemoteRunStatus};

/// Service trait for the external run-status API
#[async_trait]
pub trait RemoteRuns: Send + Sync {
    /// Looks up a run of `target` in the given status
    ///
    /// # Returns
    /// The run if at least one exists, `None` if the count is zero
    async fn find_run(
        &self,
        target: &RemoteTarget,
        status: RemoteRunStatus,
    ) -> anyhow::Result<Option<ActiveRun>>;

    /// Starts a new run of `target`
    ///
    /// # Returns
    /// `true` if the API accepted the dispatch, `false` if it answered with an
    /// error status. Transport failures are errors.
    async fn dispatch(&self, target: &RemoteTarget) -> anyhow::Result<bool>;
}

/// GitHub Actions implementation of RemoteRuns
pub struct GitHubRuns {
    client: GitHubClient,
}

impl GitHubRuns {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteRuns for GitHubRuns {
    async fn find_run(
        &self,
        target: &RemoteTarget,
        status: RemoteRunStatus,
    ) -> anyhow::Result<Option<ActiveRun>> {
        let page = self
            .client
            .list_runs(target, status.as_query())
            .await
            .with_context(|| format!("Failed to list {} runs", status))?;

        if page.total_count == 0 {
            return Ok(None);
        }

        Ok(Some(ActiveRun {
            run_id: page.workflow_runs.first().map(|run| run.id),
            status,
        }))
    }

    async fn dispatch(&self, target: &RemoteTarget) -> anyhow::Result<bool> {
        match self.client.dispatch(target).await {
            Ok(()) => Ok(true),
            Err(e @ ClientError::ApiError { .. }) => {
                warn!("Workflow dispatch rejected: {}", e);
                Ok(false)
            }
            Err(e) => Err(e).context("Failed to dispatch workflow"),
        }
    }
}
