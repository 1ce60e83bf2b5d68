//! Bridge-side device model
//!
//! These types describe devices the way the Caseta bridge reports them:
//! a device identifier, the bridge domain it lives in and its native
//! output level on a 0-100 scale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::EntityIdError;

/// Maximum output level reported by the bridge
pub const MAX_LEVEL: u8 = 100;

/// Level at or above which a shade reads as open
pub const COVER_OPEN_THRESHOLD: u8 = 5;

/// Identifier the bridge assigns to a device (e.g. "2", "zone-14")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id, validating its characters
    pub fn new(id: impl Into<String>) -> Result<Self, EntityIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(EntityIdError::EmptyDeviceId);
        }
        if !Self::is_valid(&id) {
            return Err(EntityIdError::InvalidDeviceIdChars);
        }
        Ok(Self(id))
    }

    /// Get the device id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Device ids are ASCII alphanumerics plus `_` and `-`
    fn is_valid(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl FromStr for DeviceId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> String {
        id.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Domain a device belongs to on the bridge
///
/// Only lights and covers become hub entities. Everything else the bridge
/// reports (switches, fans, Pico remotes, occupancy sensors) is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceDomain {
    Light,
    Cover,
    #[serde(other)]
    Other,
}

/// Native device state as reported by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawDeviceState {
    /// Output level, 0-100
    pub level: u8,

    /// Explicit power flag, when the bridge reports one separately from the level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
}

impl RawDeviceState {
    /// State carrying only an output level
    pub fn level(level: u8) -> Self {
        Self {
            level: level.min(MAX_LEVEL),
            on: None,
        }
    }

    /// State with an explicit power flag
    pub fn with_power(level: u8, on: bool) -> Self {
        Self {
            level: level.min(MAX_LEVEL),
            on: Some(on),
        }
    }

    /// Whether the device output is energised
    ///
    /// A zero level is always off, whatever the power flag says.
    pub fn is_on(&self) -> bool {
        self.level > 0 && self.on.unwrap_or(true)
    }
}

/// A device as reported by bridge discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    pub name: String,
    pub domain: DeviceDomain,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub state: RawDeviceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_validation() {
        assert!(DeviceId::new("2").is_ok());
        assert!(DeviceId::new("zone-14_b").is_ok());
        assert_eq!(DeviceId::new("").unwrap_err(), EntityIdError::EmptyDeviceId);
        assert_eq!(
            DeviceId::new("a.b").unwrap_err(),
            EntityIdError::InvalidDeviceIdChars
        );
        assert_eq!(
            DeviceId::new("a b").unwrap_err(),
            EntityIdError::InvalidDeviceIdChars
        );
    }

    #[test]
    fn test_zero_level_is_off_even_when_flagged_on() {
        assert!(!RawDeviceState::with_power(0, true).is_on());
        assert!(!RawDeviceState::with_power(80, false).is_on());
        assert!(RawDeviceState::level(1).is_on());
    }

    #[test]
    fn test_level_is_clamped() {
        assert_eq!(RawDeviceState::level(250).level, MAX_LEVEL);
    }

    #[test]
    fn test_unknown_domain_deserializes_as_other() {
        let domain: DeviceDomain = serde_json::from_str("\"fan\"").unwrap();
        assert_eq!(domain, DeviceDomain::Other);
        let domain: DeviceDomain = serde_json::from_str("\"cover\"").unwrap();
        assert_eq!(domain, DeviceDomain::Cover);
    }
}
