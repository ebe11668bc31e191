//! sw_post_message tool implementation.
//!
//! Posts a message to the controlling worker, e.g. a `CACHE_URLS` prefetch batch.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::HostError;
use crate::host::Host;

/// Input parameters for the sw_post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPostMessageParams {
    /// Message payload, e.g. `{"type": "CACHE_URLS", "urls": ["/img/a.png"]}`.
    pub data: serde_json::Value,

    /// Wait until the worker finished handling the message (default: true).
    #[serde(default = "default_true")]
    pub wait: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPostMessageOutput {
    pub delivered: bool,
    pub settled: bool,
}

/// Implementation of the sw_post_message tool.
pub async fn post_message_impl(host: &Host, params: SwPostMessageParams) -> Result<CallToolResult, McpError> {
    let registration = host.registration();
    if !registration.post_message(params.data).await {
        return Err(HostError::NoActiveWorker(host.origin().to_string()).into());
    }

    if params.wait {
        registration.settle().await;
    }

    json_result(&SwPostMessageOutput { delivered: true, settled: params.wait })
}
