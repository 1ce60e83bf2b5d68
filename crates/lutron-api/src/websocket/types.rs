//! WebSocket message types
//!
//! Defines incoming hub messages and outgoing driver messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Incoming Messages
// =============================================================================

/// Incoming WebSocket message from the hub
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// A request expecting a response with the same id
    Req {
        id: u64,
        msg: String,
        #[serde(default)]
        msg_data: Value,
    },
    /// A hub event; no response is sent
    Event { msg: HubEvent },
}

/// Hub lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubEvent {
    Connect,
    Disconnect,
    EnterStandby,
    ExitStandby,
    #[serde(other)]
    Other,
}

/// A request the driver understands
#[derive(Debug, PartialEq)]
pub enum Request {
    GetDriverVersion,
    GetDeviceState,
    GetAvailableEntities,
    GetEntityStates,
    EntityCommand(EntityCommand),
    SubscribeEvents,
    UnsubscribeEvents,
}

/// `msg_data` of an `entity_command` request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityCommand {
    pub entity_id: String,
    pub cmd_id: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Why a request could not be understood
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("unknown request '{0}'")]
    UnknownMessage(String),

    #[error("invalid msg_data for '{msg}': {reason}")]
    InvalidData { msg: String, reason: String },
}

impl Request {
    /// Interpret a request's `msg` and `msg_data`
    ///
    /// `msg_data` is ignored by requests that take none.
    pub fn parse(msg: &str, msg_data: Value) -> Result<Self, RequestError> {
        Ok(match msg {
            "get_driver_version" => Request::GetDriverVersion,
            "get_device_state" => Request::GetDeviceState,
            "get_available_entities" => Request::GetAvailableEntities,
            "get_entity_states" => Request::GetEntityStates,
            "subscribe_events" => Request::SubscribeEvents,
            "unsubscribe_events" => Request::UnsubscribeEvents,
            "entity_command" => {
                let command = serde_json::from_value(msg_data).map_err(|e| {
                    RequestError::InvalidData {
                        msg: msg.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Request::EntityCommand(command)
            }
            other => return Err(RequestError::UnknownMessage(other.to_string())),
        })
    }
}

// =============================================================================
// Outgoing Messages
// =============================================================================

/// Outgoing WebSocket message to the hub
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    Response(ResponseMessage),
    Event(EventMessage),
}

#[derive(Debug, Serialize)]
pub struct ResponseMessage {
    pub kind: &'static str,
    pub req_id: u64,
    pub code: u16,
    pub msg: &'static str,
    pub msg_data: Value,
}

impl ResponseMessage {
    pub fn ok(req_id: u64, msg: &'static str, msg_data: Value) -> Self {
        Self {
            kind: "resp",
            req_id,
            code: 200,
            msg,
            msg_data,
        }
    }

    pub fn error(req_id: u64, code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: "resp",
            req_id,
            code,
            msg: "result",
            msg_data: serde_json::json!({
                "code": error_code_name(code),
                "message": message.into(),
            }),
        }
    }
}

fn error_code_name(code: u16) -> &'static str {
    match code {
        400 => "BAD_REQUEST",
        404 => "NOT_FOUND",
        503 => "SERVICE_UNAVAILABLE",
        _ => "SERVER_ERROR",
    }
}

#[derive(Debug, Serialize)]
pub struct EventMessage {
    pub kind: &'static str,
    pub msg: String,
    /// Event category: ENTITY or DEVICE
    pub cat: &'static str,
    pub msg_data: Value,
}

impl EventMessage {
    pub fn new(msg: impl Into<String>, msg_data: Value) -> Self {
        let msg = msg.into();
        let cat = if msg == lutron_core::events::DEVICE_STATE {
            "DEVICE"
        } else {
            "ENTITY"
        };
        Self {
            kind: "event",
            msg,
            cat,
            msg_data,
        }
    }
}
