//! hashledger node entry point.

use anyhow::{Context, Result};
use clap::Parser;
use hashledger_server::{build_router, AppState, HttpChainFetcher, NodeArgs, NodeConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal(state: AppState) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
    state.cancel_mining().await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::try_from(NodeArgs::parse()).context("invalid configuration")?;
    init_tracing(&config.log_level);

    let node_id = Uuid::new_v4().simple().to_string();
    let fetcher =
        HttpChainFetcher::new(config.fetch_timeout).context("failed to build HTTP client")?;
    let state = AppState::new(node_id.clone(), Arc::new(fetcher), config.fetch_timeout);
    state.register_peers(&config.bootstrap_peers).await;

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, node_id = %node_id, "node listening");

    axum::serve(listener, build_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("server error")?;

    Ok(())
}
