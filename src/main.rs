use anyhow::Context;
use hedgeview::datasource::{BybitDataSource, FundingHistorySource, HyperliquidDataSource, VenueSource};
use hedgeview::orchestration::{HistoryAnalyzer, RefreshCycle, RefreshDriver, WatchList};
use hedgeview::{api, config::Config};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let hyperliquid = Arc::new(HyperliquidDataSource::new(
        config.hyperliquid_api_url.clone(),
        config.hyperliquid_account.clone(),
        config.meta_refresh,
    ));
    // No signer is configured: Bybit positions report as unavailable while
    // its funding data stays live.
    let bybit = Arc::new(BybitDataSource::new(
        config.bybit_api_url.clone(),
        config.bybit_settle_coin.clone(),
        config.bybit_interval_scale,
        config.meta_refresh,
    ));

    let venue_a: Arc<dyn VenueSource> = hyperliquid.clone();
    let venue_b: Arc<dyn VenueSource> = bybit.clone();
    let history_a: Arc<dyn FundingHistorySource> = hyperliquid;
    let history_b: Arc<dyn FundingHistorySource> = bybit;

    let watchlist = WatchList::new(config.watch_symbols.clone());
    let cycle = Arc::new(RefreshCycle::new(
        venue_a.clone(),
        venue_b.clone(),
        watchlist.clone(),
    ));
    let state = api::AppState::new(
        cycle.subscribe(),
        watchlist,
        venue_a,
        venue_b,
        Arc::new(HistoryAnalyzer::new(history_a, history_b)),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = RefreshDriver::new(cycle, config.refresh_interval);
    let mut driver_shutdown = shutdown_rx.clone();
    let driver_handle = tokio::spawn(driver.run(async move {
        let _ = driver_shutdown.changed().await;
    }));

    let app = api::create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    let mut server_shutdown = shutdown_rx;
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = server_shutdown.changed().await;
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Holding the sender keeps both shutdown futures pending.
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    server.await.context("Server error")?;
    driver_handle.await.context("Refresh driver panicked")?;
    Ok(())
}
