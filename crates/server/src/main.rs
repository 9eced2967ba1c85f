//! shellcache server entry point.
//!
//! Loads configuration, builds the cache controller over the configured storage
//! backend, runs its install/activate lifecycle and then serves the MCP tool
//! surface on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchConfig, HttpFetcher};
use shellcache_core::{AppConfig, CacheController, CacheDb, ControllerOptions, MemoryBackend, StorageBackend};
use tracing_subscriber::EnvFilter;

mod handler;
mod lifecycle;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let options = ControllerOptions::from_config(&config)?;

    let storage: Arc<dyn StorageBackend> = match &config.db_path {
        Some(path) => Arc::new(CacheDb::open(path).await?),
        None => {
            tracing::warn!("SHELLCACHE_DB_PATH not set; cache stores are kept in memory");
            Arc::new(MemoryBackend::new())
        }
    };
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(&config, options.origin.clone()))?);
    let controller = Arc::new(CacheController::new(options, storage, fetcher)?);

    if let Err(e) = lifecycle::start(&controller).await {
        tracing::error!(error = %e, "controller not activated; requests pass through to the network");
    }

    tracing::info!(origin = %controller.origin(), "Starting shellcache server on stdio transport");

    let handler = handler::ShellcacheServer::new(Arc::clone(&controller));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    controller.settle().await;

    Ok(())
}
