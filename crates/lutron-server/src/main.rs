//! Lutron Caseta integration driver
//!
//! Main entry point: loads the configuration, wires the bridge, entity
//! mapper and driver together and serves the hub endpoint.

use anyhow::{Context, Result};
use lutron_api::{create_router, AppState};
use lutron_bridge::MemoryBridge;
use lutron_config::{IntegrationConfig, Settings};
use lutron_entity_mapper::{Driver, EntityMapper};
use lutron_event_bus::EventBus;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env().context("invalid environment settings")?;

    // RUST_LOG takes precedence over UC_LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = lutron_api::DRIVER_VERSION, "Starting Lutron Caseta integration");

    let config = IntegrationConfig::load(&settings.config_home).with_context(|| {
        format!(
            "failed to load configuration from {}",
            settings.config_home.display()
        )
    })?;
    info!(
        bridge = %config.bridge.identifier,
        address = config.bridge.address.as_deref().unwrap_or("-"),
        devices = config.bridge.devices.len(),
        "Loaded configuration"
    );

    let event_bus = Arc::new(EventBus::new());
    let bridge = Arc::new(MemoryBridge::new(config.devices()));
    let mapper = Arc::new(EntityMapper::new(bridge.clone(), event_bus.clone()));
    let driver = Arc::new(Driver::new(bridge, mapper, event_bus.clone()));

    let listener_task = driver.spawn_listener();

    if let Err(e) = driver.connect().await {
        warn!(error = %e, "Initial bridge connection failed, waiting for hub connect");
    }

    let state = AppState {
        driver: driver.clone(),
        event_bus,
        driver_name: Arc::new(config.bridge.display_name().to_string()),
    };
    let app = create_router(state);

    let addr = SocketAddr::new(settings.interface, settings.http_port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening for hub connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutting down...");
    driver.disconnect().await;
    listener_task.abort();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
