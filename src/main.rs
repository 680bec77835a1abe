use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vip_gateway::{AppState, Config, LogFormat, build_router, metrics, store, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // Configuration decides the log level and format, so it is loaded first
    let config = Config::from_env();
    let (filter, log_format) = config
        .as_ref()
        .map(|c| (c.log_filter(), c.log_format))
        .unwrap_or_else(|_| (EnvFilter::new("info"), LogFormat::default()));
    init_tracing(filter, log_format);

    info!(
        "Starting VIP Gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => {
            error!("Configuration error: {e}");
            Err(exitcode::CONFIG)
        }
    };

    match result {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Install the global subscriber.
fn init_tracing(filter: EnvFilter, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .init(),
        LogFormat::Pretty => builder.with_thread_ids(true).init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        prefix = %config.api_prefix,
        db_server = %config.db_server_url,
        rate_limit = %config.rate_limit,
        "Configuration loaded"
    );
    if config.api_keys.is_empty() {
        warn!("API_KEYS is empty, every API request will be rejected with 401");
    }

    // Prometheus exporter
    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::init_metrics(metrics_addr).map_err(|e| {
            error!("Failed to start metrics exporter: {e}");
            exitcode::UNAVAILABLE
        })?;
        info!("Metrics available on http://{metrics_addr}/metrics");
    }

    // Shared store for the cache and the rate limiter
    let store = store::connect(&config).await.map_err(|e| {
        error!("Failed to connect to store: {e}");
        exitcode::UNAVAILABLE
    })?;

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;

    // Build application state and router
    let state = AppState::new(config, store).map_err(|e| {
        error!("Failed to build application state: {e}");
        exitcode::SOFTWARE
    })?;
    info!(backend = state.store_backend(), "Store ready");
    state.spawn_purge_task();
    let app = build_router(state.clone());

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    let prefix = &state.config.api_prefix;
    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  {prefix}/now                   - Current UTC time");
    info!("  GET  {prefix}/VIP/{{point_in_time}}   - VIP location");

    // Peer addresses feed the rate limiter's fallback identity
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    // Gracefully shutdown background tasks
    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
