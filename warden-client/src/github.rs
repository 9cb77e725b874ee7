//! GitHub Actions client
//!
//! Queries workflow runs by status and dispatches new runs. Only the
//! endpoints the remote poller needs are covered.

use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value as JsonValue};
use warden_core::dto::github::{DispatchRequest, WorkflowRunsPage};

use crate::error::Result;
use crate::http::{handle_empty_response, handle_response, trim_base_url};

const USER_AGENT: &str = concat!("warden/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// The workflow a poller keeps alive
#[derive(Debug, Clone, Default)]
pub struct RemoteTarget {
    pub owner: String,
    pub repo: String,
    /// Workflow file name (e.g. "keepalive.yml") or numeric workflow id
    pub workflow: String,
    /// Git ref the dispatch runs against
    pub git_ref: String,
    pub inputs: Map<String, JsonValue>,
    pub token: String,
}

impl RemoteTarget {
    /// Names of required fields that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.owner.is_empty() {
            missing.push("owner");
        }
        if self.repo.is_empty() {
            missing.push("repo");
        }
        if self.workflow.is_empty() {
            missing.push("workflow");
        }
        if self.git_ref.is_empty() {
            missing.push("ref");
        }
        if self.token.is_empty() {
            missing.push("token");
        }
        missing
    }

    fn workflow_path(&self) -> String {
        format!(
            "repos/{}/{}/actions/workflows/{}",
            self.owner, self.repo, self.workflow
        )
    }
}

/// HTTP client for the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    base_url: String,
    client: Client,
}

impl GitHubClient {
    /// # Arguments
    /// * `base_url` - API root (normally `https://api.github.com`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List runs of the target workflow in the given status
    ///
    /// Only the first page is fetched; the poller only needs the count and
    /// the newest run.
    pub async fn list_runs(&self, target: &RemoteTarget, status: &str) -> Result<WorkflowRunsPage> {
        let url = format!("{}/{}/runs", self.base_url, target.workflow_path());
        let response = self
            .authorized(self.client.get(&url), target)
            .query(&[("status", status), ("per_page", "1")])
            .send()
            .await?;

        handle_response(response).await
    }

    /// Dispatch a new run of the target workflow
    pub async fn dispatch(&self, target: &RemoteTarget) -> Result<()> {
        let url = format!("{}/{}/dispatches", self.base_url, target.workflow_path());
        let response = self
            .authorized(self.client.post(&url), target)
            .json(&DispatchRequest {
                git_ref: target.git_ref.clone(),
                inputs: target.inputs.clone(),
            })
            .send()
            .await?;

        handle_empty_response(response).await
    }

    fn authorized(&self, request: RequestBuilder, target: &RemoteTarget) -> RequestBuilder {
        request
            .bearer_auth(&target.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RemoteTarget {
        RemoteTarget {
            owner: "octo".to_string(),
            repo: "keepalive".to_string(),
            workflow: "vps.yml".to_string(),
            git_ref: "main".to_string(),
            inputs: Map::new(),
            token: "ghp_test".to_string(),
        }
    }

    #[test]
    fn test_complete_target_has_no_missing_fields() {
        assert!(target().missing_fields().is_empty());
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let target = RemoteTarget {
            repo: String::new(),
            token: String::new(),
            ..target()
        };
        assert_eq!(target.missing_fields(), vec!["repo", "token"]);
    }

    #[test]
    fn test_workflow_path() {
        assert_eq!(
            target().workflow_path(),
            "repos/octo/keepalive/actions/workflows/vps.yml"
        );
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GitHubClient::new("https://api.github.com/");
        assert_eq!(client.base_url(), "https://api.github.com");
    }
}
