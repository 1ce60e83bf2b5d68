//! Hub-facing entity attributes and their derivation from bridge state

use serde::{Deserialize, Serialize};

use crate::device::{RawDeviceState, COVER_OPEN_THRESHOLD, MAX_LEVEL};
use crate::kind::EntityKind;

/// Maximum brightness on the hub scale
pub const MAX_BRIGHTNESS: u8 = 255;

/// Convert a bridge level (0-100) to hub brightness (0-255)
pub fn level_to_brightness(level: u8) -> u8 {
    let level = u32::from(level.min(MAX_LEVEL));
    ((level * u32::from(MAX_BRIGHTNESS) + 50) / u32::from(MAX_LEVEL)) as u8
}

/// Convert hub brightness (0-255) to a bridge level (0-100)
///
/// Any non-zero brightness maps to at least level 1 so that dimming a light
/// all the way down never turns it off.
pub fn brightness_to_level(brightness: u8) -> u8 {
    if brightness == 0 {
        return 0;
    }
    let scaled =
        (u32::from(brightness) * u32::from(MAX_LEVEL) + 127) / u32::from(MAX_BRIGHTNESS);
    scaled.max(1) as u8
}

/// Power state of a light entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightState {
    On,
    Off,
    Unavailable,
}

/// Attributes of a light entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightAttributes {
    pub state: LightState,
    /// Brightness on the hub scale; always 0 unless the light is on
    pub brightness: u8,
}

impl LightAttributes {
    /// Map bridge state to light attributes
    pub fn from_raw(raw: &RawDeviceState) -> Self {
        if raw.is_on() {
            Self {
                state: LightState::On,
                brightness: level_to_brightness(raw.level),
            }
        } else {
            Self {
                state: LightState::Off,
                brightness: 0,
            }
        }
    }

    pub fn unavailable() -> Self {
        Self {
            state: LightState::Unavailable,
            brightness: 0,
        }
    }

    pub fn is_on(&self) -> bool {
        self.state == LightState::On
    }
}

/// State of a cover entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoverState {
    Open,
    Closed,
    Unavailable,
}

/// Attributes of a cover entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverAttributes {
    pub state: CoverState,
}

impl CoverAttributes {
    /// Map bridge state to cover attributes
    pub fn from_raw(raw: &RawDeviceState) -> Self {
        let state = if raw.level >= COVER_OPEN_THRESHOLD {
            CoverState::Open
        } else {
            CoverState::Closed
        };
        Self { state }
    }

    pub fn unavailable() -> Self {
        Self {
            state: CoverState::Unavailable,
        }
    }
}

/// Attributes of any entity kind
///
/// Serializes to the flat attribute map the hub expects, e.g.
/// `{"state": "ON", "brightness": 128}` or `{"state": "OPEN"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntityAttributes {
    Light(LightAttributes),
    Cover(CoverAttributes),
}

impl EntityAttributes {
    /// Map bridge state to the attributes of the given kind
    pub fn from_raw(kind: EntityKind, raw: &RawDeviceState) -> Self {
        match kind {
            EntityKind::Light => EntityAttributes::Light(LightAttributes::from_raw(raw)),
            EntityKind::Cover => EntityAttributes::Cover(CoverAttributes::from_raw(raw)),
        }
    }

    /// Attributes reporting the entity as unavailable
    pub fn unavailable(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Light => EntityAttributes::Light(LightAttributes::unavailable()),
            EntityKind::Cover => EntityAttributes::Cover(CoverAttributes::unavailable()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityAttributes::Light(_) => EntityKind::Light,
            EntityAttributes::Cover(_) => EntityKind::Cover,
        }
    }

    /// The attributes as a JSON object
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_brightness_scale_endpoints() {
        assert_eq!(level_to_brightness(0), 0);
        assert_eq!(level_to_brightness(100), 255);
        assert_eq!(level_to_brightness(50), 128);
        assert_eq!(brightness_to_level(0), 0);
        assert_eq!(brightness_to_level(255), 100);
        assert_eq!(brightness_to_level(128), 50);
    }

    #[test]
    fn test_low_brightness_never_turns_off() {
        assert_eq!(brightness_to_level(1), 1);
        assert_eq!(brightness_to_level(2), 1);
    }

    #[test]
    fn test_light_off_has_zero_brightness() {
        let attrs = LightAttributes::from_raw(&RawDeviceState::with_power(75, false));
        assert_eq!(attrs.state, LightState::Off);
        assert_eq!(attrs.brightness, 0);
    }

    #[test]
    fn test_cover_threshold() {
        assert_eq!(
            CoverAttributes::from_raw(&RawDeviceState::level(4)).state,
            CoverState::Closed
        );
        assert_eq!(
            CoverAttributes::from_raw(&RawDeviceState::level(5)).state,
            CoverState::Open
        );
    }

    #[test]
    fn test_attribute_map() {
        let light = EntityAttributes::from_raw(EntityKind::Light, &RawDeviceState::level(100));
        assert_eq!(
            serde_json::Value::Object(light.to_map()),
            json!({"state": "ON", "brightness": 255})
        );

        let cover = EntityAttributes::unavailable(EntityKind::Cover);
        assert_eq!(
            serde_json::Value::Object(cover.to_map()),
            json!({"state": "UNAVAILABLE"})
        );
    }
}
