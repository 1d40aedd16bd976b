use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cdp_liquidator::api::router::create_router;
use cdp_liquidator::config::{AppConfig, LogFormat};
use cdp_liquidator::pricing::StaticPriceOracle;
use cdp_liquidator::store::PgStore;
use cdp_liquidator::{db, metrics, AppState};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database connected, migrations applied");

    let metrics_handle = metrics::init_metrics();
    let prices = StaticPriceOracle::default().with_jitter_bps(config.price_jitter_bps);

    tracing::info!(
        liquidation_threshold = config.liquidation_threshold,
        price_jitter_bps = config.price_jitter_bps,
        execution_lease = config.execution_lease_enabled,
        auth = config.auth_enabled(),
        "Liquidation pipeline configured"
    );

    let state = AppState::new(config, Arc::new(PgStore::new(pool)), Arc::new(prices), metrics_handle);
    let monitor = state.monitor.clone();
    let limiter_cleanup = state.rate_limiter.spawn_cleanup(RATE_LIMIT_CLEANUP_INTERVAL);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    limiter_cleanup.abort();

    if monitor.stop().await {
        tracing::info!("Block monitor stopped on shutdown");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Standard => registry.with(fmt::layer()).init(),
    }
}
