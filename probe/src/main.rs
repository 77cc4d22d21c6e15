mod awsecs;
mod config;
mod error;
mod handlers;
mod state;
mod tagger;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::awsecs::{HttpFetcher, Reporter};
use crate::config::ProbeConfig;
use crate::state::AppState;

const DEFAULT_LOG_FILTER: &str = "probe=debug,tower_http=info,axum=info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cfg = ProbeConfig::from_env();
    info!(
        "probe arrancando (metadata={}, intervalo={:?})",
        cfg.metadata_url, cfg.tag_interval
    );

    let fetcher = HttpFetcher::new(cfg.metadata_url.clone(), cfg.fetch_timeout);
    let state = AppState::new(Arc::new(Reporter::new(fetcher)));

    // router HTTP
    let app = handlers::build_router(state.clone());

    // pasadas de tagging en segundo plano
    let loop_state = state.clone();
    let interval = cfg.tag_interval;
    tokio::spawn(async move {
        tagger::run_tagging_loop(loop_state, interval).await;
    });

    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", cfg.listen_addr))?;
    info!("probe escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
