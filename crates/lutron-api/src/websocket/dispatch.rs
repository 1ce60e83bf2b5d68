//! WebSocket message dispatch
//!
//! Routes hub requests to the driver and entity mapper, and hub lifecycle
//! events to the driver.

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::ActiveConnection;
use super::types::{HubEvent, IncomingMessage, OutgoingMessage, Request, ResponseMessage};

/// Handle an incoming message
pub async fn handle_message(
    conn: &ActiveConnection,
    text: &str,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> Result<(), String> {
    let msg: IncomingMessage =
        serde_json::from_str(text).map_err(|e| format!("Invalid message format: {e}"))?;

    match msg {
        IncomingMessage::Req { id, msg, msg_data } => {
            let response = match Request::parse(&msg, msg_data) {
                Ok(request) => handle_request(conn, id, request, tx).await,
                Err(e) => {
                    warn!(error = %e, "Rejecting request");
                    ResponseMessage::error(id, 400, e.to_string())
                }
            };
            tx.send(OutgoingMessage::Response(response))
                .await
                .map_err(|e| e.to_string())
        }
        IncomingMessage::Event { msg } => {
            handle_hub_event(conn, msg).await;
            Ok(())
        }
    }
}

/// Execute a request and build its response
pub async fn handle_request(
    conn: &ActiveConnection,
    id: u64,
    request: Request,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> ResponseMessage {
    let state = &conn.state;
    let mapper = state.driver.mapper();

    match request {
        Request::GetDriverVersion => ResponseMessage::ok(
            id,
            "driver_version",
            json!({
                "name": state.driver_name.as_str(),
                "version": {
                    "api": crate::API_VERSION,
                    "driver": crate::DRIVER_VERSION,
                },
            }),
        ),
        Request::GetDeviceState => ResponseMessage::ok(
            id,
            "device_state",
            json!({ "state": state.driver.device_state().await }),
        ),
        Request::GetAvailableEntities => ResponseMessage::ok(
            id,
            "available_entities",
            json!({ "available_entities": mapper.available_entities() }),
        ),
        Request::GetEntityStates => {
            ResponseMessage::ok(id, "entity_states", json!(mapper.entity_states()))
        }
        Request::EntityCommand(command) => {
            debug!(
                entity_id = %command.entity_id,
                cmd_id = %command.cmd_id,
                "Entity command"
            );
            match mapper
                .handle_command(&command.entity_id, &command.cmd_id, command.params.as_ref())
                .await
            {
                Ok(()) => ResponseMessage::ok(id, "result", json!({})),
                Err(e) => ResponseMessage::error(id, e.status_code(), e.to_string()),
            }
        }
        Request::SubscribeEvents => {
            conn.subscribe(tx).await;
            ResponseMessage::ok(id, "result", json!({}))
        }
        Request::UnsubscribeEvents => {
            conn.unsubscribe().await;
            ResponseMessage::ok(id, "result", json!({}))
        }
    }
}

/// React to a hub lifecycle event
pub async fn handle_hub_event(conn: &ActiveConnection, event: HubEvent) {
    let driver = &conn.state.driver;
    match event {
        HubEvent::Connect | HubEvent::ExitStandby => {
            info!(?event, "Connecting to bridge");
            if let Err(e) = driver.connect().await {
                warn!(error = %e, "Bridge connection failed");
            }
        }
        HubEvent::Disconnect | HubEvent::EnterStandby => {
            info!(?event, "Disconnecting from bridge");
            driver.disconnect().await;
        }
        HubEvent::Other => debug!("Ignoring unknown hub event"),
    }
}
