mod api;
mod config;
mod engine;
mod error;
mod models;
mod observability;
mod state;
mod store;

use std::sync::Arc;

use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let shared_state = Arc::new(state::AppState::new(config.event_buffer_size));

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::overdue::run_overdue_monitor(
        shared_state.clone(),
        config.overdue_threshold,
        Duration::from_secs(config.overdue_check_interval_secs),
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
