//! Hub WebSocket protocol
//!
//! This module is organized into:
//! - `types` - Message type definitions (IncomingMessage, OutgoingMessage, etc.)
//! - `connection` - Session handling and event subscription
//! - `dispatch` - Routing of requests and hub events

mod connection;
mod dispatch;
mod types;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};

use crate::AppState;

pub use connection::ActiveConnection;
pub use dispatch::{handle_hub_event, handle_message, handle_request};
pub use types::{
    EntityCommand, EventMessage, HubEvent, IncomingMessage, OutgoingMessage, Request,
    RequestError, ResponseMessage,
};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state))
}
