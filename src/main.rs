use anyhow::{Context, Result};
use clap::Parser;
use coin_price_service::{
    config::ServiceConfig,
    logging,
    providers::CoinMarketCapSource,
    server::{self, AppState},
    PriceCache, PriceTracker, QueryService,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::parse().normalized();
    logging::init_tracing(config.log_json);
    config.validate().context("invalid configuration")?;

    let settings = config.refresh_settings();
    let cache = Arc::new(PriceCache::new(settings.all_coins()));
    let query = Arc::new(QueryService::new(cache.clone(), settings.all_coins()));

    let source = CoinMarketCapSource::with_base_url(&config.api_url, config.request_timeout())
        .context("failed to build CoinMarketCap client")?;
    let tracker = Arc::new(PriceTracker::new(cache, Arc::new(source), settings));

    let (stop_tx, stop_rx) = watch::channel(false);
    let refresh = tracker.spawn(stop_rx);

    let state = Arc::new(AppState {
        query,
        tracker,
        param: config.param.clone(),
    });
    let app = server::router(state, &config.path);

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!(
        addr = %config.addr,
        path = %config.path,
        param = %config.param,
        "Price service listening"
    );

    server::serve(listener, app, shutdown_signal())
        .await
        .context("http server failed")?;

    let _ = stop_tx.send(true);
    refresh.await.context("refresh loop panicked")?;
    info!("Price service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, gracefully stopping");
}
