//! Entity ID type representing a kind.device_id pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::device::DeviceId;
use crate::kind::EntityKind;

/// Error type for invalid entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("unknown entity kind '{0}' (expected 'light' or 'cover')")]
    UnknownKind(String),

    #[error("device_id cannot be empty")]
    EmptyDeviceId,

    #[error("device_id contains invalid characters (must be ASCII alphanumeric, '_' or '-')")]
    InvalidDeviceIdChars,
}

/// Represents a hub entity ID (e.g., "light.12")
///
/// Entity IDs consist of the entity kind and the bridge device id separated
/// by a period. There is exactly one entity per bridge device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    kind: EntityKind,
    device_id: DeviceId,
}

impl EntityId {
    /// Create a new EntityId from its parts
    pub fn new(kind: EntityKind, device_id: DeviceId) -> Self {
        Self { kind, device_id }
    }

    /// Get the kind part of the entity ID
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Get the device part of the entity ID
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, device) = s.split_once('.').ok_or(EntityIdError::InvalidFormat)?;
        if device.contains('.') {
            return Err(EntityIdError::InvalidFormat);
        }
        let kind = kind
            .parse::<EntityKind>()
            .map_err(|_| EntityIdError::UnknownKind(kind.to_string()))?;
        Ok(Self::new(kind, DeviceId::new(device)?))
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_entity_id() {
        let id = EntityId::new(EntityKind::Light, DeviceId::new("12").unwrap());
        assert_eq!(id.kind(), EntityKind::Light);
        assert_eq!(id.device_id().as_str(), "12");
        assert_eq!(id.to_string(), "light.12");
    }

    #[test]
    fn test_parse_entity_id() {
        let id: EntityId = "cover.7".parse().unwrap();
        assert_eq!(id.kind(), EntityKind::Cover);
        assert_eq!(id.device_id().as_str(), "7");
    }

    #[test]
    fn test_invalid_format() {
        assert_eq!(
            "no_separator".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidFormat
        );
        assert_eq!(
            "light.1.2".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidFormat
        );
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(
            "media_player.4".parse::<EntityId>().unwrap_err(),
            EntityIdError::UnknownKind("media_player".to_string())
        );
    }

    #[test]
    fn test_bad_device_part() {
        assert_eq!(
            "light.".parse::<EntityId>().unwrap_err(),
            EntityIdError::EmptyDeviceId
        );
        assert_eq!(
            "light.a b".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidDeviceIdChars
        );
    }

    #[test]
    fn test_serde_as_string() {
        let id: EntityId = "light.kitchen-2".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"light.kitchen-2\"");
    }
}
