//! Error types for the entity mapper

use lutron_bridge::BridgeError;
use lutron_core::DeviceId;
use thiserror::Error;

/// Result type for mapper operations
pub type MapperResult<T> = Result<T, MapperError>;

/// Errors raised while translating between the hub and the bridge
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MapperError {
    /// The entity id does not belong to a currently known device
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// A bridge notification referred to a device that is not tracked
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// The command is not valid for the entity's kind
    #[error("command '{command}' is not supported by {entity_id}")]
    UnsupportedCommand { entity_id: String, command: String },

    /// Command parameters are missing or out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The bridge could not carry out the call
    #[error("bridge unavailable: {0}")]
    BridgeUnavailable(#[from] BridgeError),
}

impl MapperError {
    /// Status code reported to the hub for a failed command
    pub fn status_code(&self) -> u16 {
        match self {
            MapperError::InvalidParameter(_) | MapperError::UnsupportedCommand { .. } => 400,
            MapperError::UnknownEntity(_) | MapperError::UnknownDevice(_) => 404,
            MapperError::BridgeUnavailable(_) => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(MapperError::UnknownEntity("light.1".into()).status_code(), 404);
        assert_eq!(
            MapperError::UnsupportedCommand {
                entity_id: "light.1".into(),
                command: "open".into()
            }
            .status_code(),
            400
        );
        assert_eq!(
            MapperError::BridgeUnavailable(BridgeError::NotConnected).status_code(),
            503
        );
    }
}
