//! sw_deploy and sw_activate_waiting tool implementations.
//!
//! Deploying installs a new worker version; it takes control right away when
//! nothing controls the origin yet or it activates immediately, and otherwise
//! waits until `sw_activate_waiting` is called.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vitrine_worker::{ActivateReport, RegisterOutcome};

use super::json_result;
use crate::host::Host;

/// Input parameters for the sw_deploy tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwDeployParams {
    /// Precache version tag (default: configured `precache_version`).
    #[serde(default)]
    pub precache_version: Option<String>,

    /// Runtime cache version tag (default: configured `runtime_version`).
    #[serde(default)]
    pub runtime_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwDeployOutput {
    /// "activated" or "waiting".
    pub outcome: String,
    /// Generations deleted on activation.
    pub deleted: Vec<String>,
    pub claimed: bool,
}

impl From<RegisterOutcome> for SwDeployOutput {
    fn from(outcome: RegisterOutcome) -> Self {
        match outcome {
            RegisterOutcome::Activated(report) => Self::activated(report),
            RegisterOutcome::Waiting => Self { outcome: "waiting".into(), deleted: Vec::new(), claimed: false },
        }
    }
}

impl SwDeployOutput {
    fn activated(report: ActivateReport) -> Self {
        Self { outcome: "activated".into(), deleted: report.deleted, claimed: report.claimed }
    }
}

/// Implementation of the sw_deploy tool.
pub async fn deploy_impl(host: &Host, params: SwDeployParams) -> Result<CallToolResult, McpError> {
    let outcome = host
        .deploy(params.precache_version.as_deref(), params.runtime_version.as_deref())
        .await?;
    json_result(&SwDeployOutput::from(outcome))
}

/// Implementation of the sw_activate_waiting tool.
///
/// Without a waiting worker this reports `"outcome": "none"`.
pub async fn activate_waiting_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let output = match host.registration().activate_waiting().await? {
        Some(report) => SwDeployOutput::activated(report),
        None => SwDeployOutput { outcome: "none".into(), deleted: Vec::new(), claimed: false },
    };
    json_result(&output)
}
