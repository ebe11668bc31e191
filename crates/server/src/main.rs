//! vitrine-sw server entry point.
//!
//! Boots the cache worker for the configured origin and exposes it as an MCP
//! server on stdio transport. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use vitrine_client::{FetchConfig, HttpFetcher};
use vitrine_core::{AppConfig, CacheStore, MemoryStore, SqliteStore, StoreKind};

mod error;
mod handler;
mod host;
mod tools;

async fn open_store(config: &AppConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.store {
        StoreKind::Sqlite => {
            tracing::info!(path = %config.db_path.display(), "opening sqlite cache store");
            Arc::new(SqliteStore::open(&config.db_path).await?)
        }
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let worker_config = config.worker_config()?;
    tracing::info!(origin = %worker_config.origin, "Starting vitrine-sw server on stdio transport");

    let store = open_store(&config).await?;
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from_app(&config)?)?);
    let host = Arc::new(host::Host::new(worker_config, fetcher, store));

    // An unreachable origin at boot is not fatal; sw_deploy can retry later.
    match host.deploy(None, None).await {
        Ok(outcome) => tracing::info!(?outcome, "initial worker registered"),
        Err(e) => tracing::warn!(error = %e, "initial worker failed to install"),
    }

    let handler = handler::VitrineServer::new(host.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    host.registration().settle().await;

    Ok(())
}
