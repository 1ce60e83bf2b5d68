//! Hub-facing control endpoint
//!
//! Serves the integration's WebSocket protocol and a health check using
//! axum. The hub connects to `/ws`, issues requests (entity listing,
//! entity commands, event subscription) and sends lifecycle events
//! (connect, disconnect, standby).

pub mod websocket;

use axum::{routing::get, Router};
use lutron_entity_mapper::Driver;
use lutron_event_bus::EventBus;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Version of the hub integration API implemented by the endpoint
pub const API_VERSION: &str = "0.12.0";

/// Version of this driver
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub driver: Arc<Driver>,
    pub event_bus: Arc<EventBus>,
    /// Name reported in `get_driver_version`
    pub driver_name: Arc<String>,
}

/// Create the endpoint router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// GET /health - Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
