//! MCP tool implementations.
//!
//! This module contains all tools exposed by the vitrine-sw server.

pub mod cache;
pub mod sw_deploy;
pub mod sw_fetch;
pub mod sw_post_message;
pub mod sw_status;

pub use sw_deploy::{SwDeployParams, activate_waiting_impl, deploy_impl};
pub use sw_fetch::{SwFetchParams, fetch_impl};
pub use sw_post_message::{SwPostMessageParams, post_message_impl};
pub use sw_status::status_impl;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use vitrine_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use rmcp::model::CallToolResult;
    use vitrine_core::{MemoryStore, WorkerConfig};
    use vitrine_worker::testing::{FakeNetwork, origin};

    use crate::host::Host;

    /// A host over a fake network that already serves the app shell.
    pub fn host() -> (Arc<FakeNetwork>, Host) {
        let network = Arc::new(FakeNetwork::new());
        network.serve_shell();
        let host = Host::new(WorkerConfig::catalog_cache(origin()), network.clone(), Arc::new(MemoryStore::new()));
        (network, host)
    }

    /// Parse the JSON text of a successful tool result.
    pub fn output(result: &CallToolResult) -> serde_json::Value {
        let text = result.content[0].as_text().map(|t| t.text.clone()).unwrap_or_default();
        serde_json::from_str(&text).unwrap()
    }
}
