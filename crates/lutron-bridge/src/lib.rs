//! Bridge client seam for the Lutron Caseta smart bridge
//!
//! The bridge protocol itself lives behind the [`BridgeClient`] trait. The
//! entity mapper only ever issues [`BridgeCommand`]s and consumes
//! [`BridgeEvent`]s, so any transport that can do both can drive it.
//! [`MemoryBridge`] is an in-process implementation backed by a static
//! device list.

mod memory;

use async_trait::async_trait;
use lutron_core::{DeviceId, DeviceInfo, RawDeviceState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

pub use memory::MemoryBridge;

/// Errors reported by a bridge client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("bridge unreachable: {0}")]
    Unreachable(String),

    #[error("bridge connection is not established")]
    NotConnected,

    #[error("device not found on bridge: {0}")]
    DeviceNotFound(DeviceId),

    #[error("bridge rejected command: {0}")]
    Rejected(String),
}

/// A command understood by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BridgeCommand {
    /// Switch a dimmer or switch to full output
    TurnOn,
    /// Switch output off
    TurnOff,
    /// Set the output level (0-100)
    SetValue(u8),
    /// Raise a shade fully
    OpenCover,
    /// Lower a shade fully
    CloseCover,
    /// Stop a moving shade
    StopCover,
}

/// A device state change reported by the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateNotification {
    pub device_id: DeviceId,
    pub state: RawDeviceState,
    /// Emission order assigned by the bridge client; strictly increasing per device
    pub sequence: u64,
}

/// Notifications emitted by a bridge client
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// The bridge connection was established
    Connected,
    /// The bridge connection was lost or closed
    Disconnected,
    /// A device appeared on the bridge
    Discovered(DeviceInfo),
    /// A device is no longer reported by the bridge
    Removed(DeviceId),
    /// A device reported a new state
    StateChanged(StateNotification),
}

/// Client for a Lutron Caseta bridge
///
/// Implementations own the bridge connection, including any reconnect or
/// retry policy. Callers never retry failed commands.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Establish the bridge connection
    async fn connect(&self) -> Result<(), BridgeError>;

    /// Close the bridge connection
    async fn disconnect(&self) -> Result<(), BridgeError>;

    /// Snapshot of every device the bridge currently reports
    async fn devices(&self) -> Result<Vec<DeviceInfo>, BridgeError>;

    /// Issue a command; `Ok` means the bridge acknowledged it
    async fn send(&self, device_id: &DeviceId, command: BridgeCommand) -> Result<(), BridgeError>;

    /// Subscribe to bridge notifications
    fn events(&self) -> broadcast::Receiver<BridgeEvent>;

    /// Whether the connection is currently established
    fn is_connected(&self) -> bool;
}

/// Shared handle to a bridge client
pub type SharedBridgeClient = Arc<dyn BridgeClient>;
