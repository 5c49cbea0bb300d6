mod chain;
mod config;
mod errors;
mod pricing;
mod report;
mod server;
mod state;
mod strategies;

use crate::chain::snapshot::SnapshotChainProvider;
use crate::chain::yahoo::YahooChainClient;
use crate::chain::ChainProvider;
use crate::config::{AppConfig, ChainSource};
use crate::errors::{EngineError, EngineResult};
use crate::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Structured logging to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("strategy_pnl starting");

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let provider = match build_provider(&cfg) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("chain provider error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        source = %cfg.chain_source,
        provider = provider.name(),
        cors_origin = cfg.cors_origin.as_deref().unwrap_or("*"),
        max_listed_expiries = cfg.report.max_listed_expiries,
        strike_window = cfg.report.strike_window,
        price_range_pct = cfg.report.price_range_pct,
        "configuration loaded"
    );

    let port = cfg.server_port;
    let app = server::router(AppState::new(cfg, provider));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}

fn build_provider(cfg: &AppConfig) -> EngineResult<Arc<dyn ChainProvider>> {
    match cfg.chain_source {
        ChainSource::Yahoo => Ok(Arc::new(YahooChainClient::new(
            &cfg.yahoo_base_url,
            cfg.http_timeout_secs,
        ))),
        ChainSource::Snapshot => {
            let path = cfg
                .snapshot_path
                .as_deref()
                .ok_or_else(|| EngineError::Config("CHAIN_SNAPSHOT_PATH is not set".into()))?;
            Ok(Arc::new(SnapshotChainProvider::from_file(path)?))
        }
    }
}
