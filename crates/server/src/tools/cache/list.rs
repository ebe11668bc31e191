//! cache_list tool implementation.
//!
//! Lists the request identities stored in one generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vitrine_core::Error;

use crate::error::HostError;
use crate::host::Host;
use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Generation name, e.g. "precache-v1" or "runtime-v1".
    pub generation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListEntry {
    pub method: String,
    pub url: String,
    /// Store key of the entry.
    pub hash: String,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub generation: String,
    pub entries: Vec<CacheListEntry>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(host: &Host, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let generation = params.generation.trim();
    if generation.is_empty() {
        return Err(Error::InvalidInput("generation cannot be empty".into()).into());
    }

    let store = host.store();
    if !store.has(generation).await? {
        return Err(HostError::UnknownGeneration(generation.to_string()).into());
    }

    let entries = store
        .entries(generation)
        .await?
        .into_iter()
        .map(|id| CacheListEntry { method: id.method().to_string(), url: id.url().to_string(), hash: id.hash() })
        .collect();

    json_result(&CacheListOutput { generation: generation.to_string(), entries })
}
