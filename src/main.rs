// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::broker::Broker;
use crate::application::simulator_service::SimulatorService;
use crate::infrastructure::config::load_simulator_config;
use crate::infrastructure::http_unit_source::HttpUnitSource;
use crate::infrastructure::mqtt_connection::MqttConnection;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_status, health_check, list_units, publish_once, reset_sensors, select_unit,
    set_auto_send, set_sensor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = load_simulator_config()?;
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid server.bind address {}", config.server.bind))?;

    // Bind before anything is started so a setup failure leaves nothing running
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Create adapters (infrastructure layer)
    let unit_source = Arc::new(HttpUnitSource::new(
        &config.directory_base_url(),
        &config.directory.units_path,
        Duration::from_millis(config.directory.timeout_ms),
    )?);
    tracing::info!("Unit directory source: {}", unit_source.url());

    let broker: Arc<dyn Broker> = Arc::new(MqttConnection::connect(&config.broker));

    // Start the simulator (application layer); it owns the broker session from here on
    let (simulator, simulator_task) =
        SimulatorService::new(&config.publish, broker).spawn(unit_source);

    let state = Arc::new(AppState {
        simulator: simulator.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(get_status))
        .route("/units", get(list_units))
        .route("/units/active", put(select_unit))
        .route("/sensors/reset", post(reset_sensors))
        .route("/sensors/:name", put(set_sensor))
        .route("/auto-send", put(set_auto_send))
        .route("/publish", post(publish_once))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Starting sensor-simulator control API on {}", addr);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Release the timer and the broker session whichever way the server ended
    simulator.shutdown().await;
    if let Err(e) = simulator_task.await {
        tracing::warn!("Simulator task ended abnormally: {}", e);
    }

    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
