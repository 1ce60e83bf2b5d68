//! Core types for the Lutron Caseta integration
//!
//! This crate provides the fundamental types shared by the bridge client,
//! the entity mapper and the hub-facing API: EntityId, EntityKind, Command,
//! the attribute model, the bridge device model and typed events.

mod attributes;
mod device;
mod entity_id;
mod event;
mod kind;

pub use attributes::{
    brightness_to_level, level_to_brightness, CoverAttributes, CoverState, EntityAttributes,
    LightAttributes, LightState, MAX_BRIGHTNESS,
};
pub use device::{
    DeviceDomain, DeviceId, DeviceInfo, RawDeviceState, COVER_OPEN_THRESHOLD, MAX_LEVEL,
};
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use kind::{Command, EntityKind, COVER_COMMANDS, LIGHT_COMMANDS};

/// Standard event types published towards the hub
pub mod events {
    use super::*;
    use serde::{Deserialize, Serialize};

    /// Event type for a newly exposed entity
    pub const ENTITY_AVAILABLE: &str = "entity_available";

    /// Event type for an entity that is no longer exposed
    pub const ENTITY_REMOVED: &str = "entity_removed";

    /// Event type for changed entity attributes
    pub const ENTITY_CHANGE: &str = "entity_change";

    /// Event type for the integration's connection state
    pub const DEVICE_STATE: &str = "device_state";

    /// Data for ENTITY_AVAILABLE events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EntityAvailableData {
        pub entity_id: EntityId,
        pub entity_type: EntityKind,
        pub name: String,
        pub features: Vec<Command>,
        pub attributes: serde_json::Map<String, serde_json::Value>,
    }

    impl EventData for EntityAvailableData {
        fn event_type() -> &'static str {
            ENTITY_AVAILABLE
        }
    }

    /// Data for ENTITY_REMOVED events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EntityRemovedData {
        pub entity_id: EntityId,
    }

    impl EventData for EntityRemovedData {
        fn event_type() -> &'static str {
            ENTITY_REMOVED
        }
    }

    /// Data for ENTITY_CHANGE events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EntityChangeData {
        pub entity_id: EntityId,
        pub entity_type: EntityKind,
        pub attributes: serde_json::Map<String, serde_json::Value>,
    }

    impl EventData for EntityChangeData {
        fn event_type() -> &'static str {
            ENTITY_CHANGE
        }
    }

    /// Connection state of the integration as reported to the hub
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum DeviceState {
        Connected,
        Connecting,
        Disconnected,
        Error,
    }

    /// Data for DEVICE_STATE events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DeviceStateData {
        pub state: DeviceState,
    }

    impl EventData for DeviceStateData {
        fn event_type() -> &'static str {
            DEVICE_STATE
        }
    }
}
