//! GitHub Actions DTOs
//!
//! Subset of the workflow runs API used by the remote poller.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Response of `GET /repos/{owner}/{repo}/actions/workflows/{workflow}/runs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunsPage {
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub status: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Body of `POST /repos/{owner}/{repo}/actions/workflows/{workflow}/dispatches`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: serde_json::Map<String, JsonValue>,
}
