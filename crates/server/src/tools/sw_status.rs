//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use vitrine_core::CacheStore;
use vitrine_worker::{Engine, EngineStatus, GenerationStatus};

use super::json_result;
use crate::host::Host;

#[derive(Debug, Clone, Serialize)]
pub struct SwStatusOutput {
    pub origin: String,
    pub active: Option<WorkerSummary>,
    pub waiting: Option<WorkerSummary>,
    /// Every generation in the store, in creation order.
    pub generations: Vec<GenerationStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerSummary {
    pub state: String,
    pub precache: String,
    pub runtime: String,
}

async fn summary(engine: Option<std::sync::Arc<Engine>>) -> Option<WorkerSummary> {
    let engine = engine?;
    let config = engine.config();
    Some(WorkerSummary {
        state: engine.state().await.to_string(),
        precache: config.precache_name(),
        runtime: config.runtime_name(),
    })
}

async fn generations(store: &dyn CacheStore) -> Result<Vec<GenerationStatus>, vitrine_core::Error> {
    let mut out = Vec::new();
    for name in store.keys().await? {
        let entries = store.entries(&name).await?.len();
        out.push(GenerationStatus { name, entries });
    }
    Ok(out)
}

/// Implementation of the sw_status tool.
pub async fn status_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let registration = host.registration();

    // The active engine's view is authoritative when there is one.
    let generations = match registration.active().await {
        Some(engine) => {
            let EngineStatus { generations, .. } = engine.status().await?;
            generations
        }
        None => generations(host.store().as_ref()).await?,
    };

    let output = SwStatusOutput {
        origin: host.origin().to_string(),
        active: summary(registration.active().await).await,
        waiting: summary(registration.waiting().await).await,
        generations,
    };

    json_result(&output)
}
