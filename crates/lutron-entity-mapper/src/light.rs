//! Light command resolution

use lutron_bridge::BridgeCommand;
use lutron_core::{brightness_to_level, Command, LightAttributes, MAX_BRIGHTNESS};
use serde_json::Value;

use crate::error::{MapperError, MapperResult};

/// Parameter carrying the hub brightness (0-255)
pub const BRIGHTNESS_PARAM: &str = "brightness";

/// Resolve a light command into the bridge call that carries it out
///
/// `current` is the last known attribute set, used to resolve `toggle`.
pub(crate) fn resolve(
    command: Command,
    params: Option<&Value>,
    current: &LightAttributes,
) -> MapperResult<BridgeCommand> {
    match command {
        Command::TurnOn => match brightness_param(params)? {
            Some(brightness) => Ok(dim_to(brightness)),
            None => Ok(BridgeCommand::TurnOn),
        },
        Command::SetBrightness => {
            let brightness = brightness_param(params)?.ok_or_else(|| {
                MapperError::InvalidParameter(format!("'{BRIGHTNESS_PARAM}' is required"))
            })?;
            Ok(dim_to(brightness))
        }
        Command::TurnOff => Ok(BridgeCommand::TurnOff),
        Command::Toggle if current.is_on() => Ok(BridgeCommand::TurnOff),
        Command::Toggle => Ok(BridgeCommand::TurnOn),
        Command::Open | Command::Close | Command::Stop => Err(MapperError::UnsupportedCommand {
            entity_id: String::new(),
            command: command.to_string(),
        }),
    }
}

/// Brightness 0 is the same as switching off
fn dim_to(brightness: u8) -> BridgeCommand {
    match brightness_to_level(brightness) {
        0 => BridgeCommand::TurnOff,
        level => BridgeCommand::SetValue(level),
    }
}

fn brightness_param(params: Option<&Value>) -> MapperResult<Option<u8>> {
    let Some(value) = params.and_then(|p| p.get(BRIGHTNESS_PARAM)) else {
        return Ok(None);
    };
    match value.as_u64() {
        Some(b) if b <= u64::from(MAX_BRIGHTNESS) => Ok(Some(b as u8)),
        _ => Err(MapperError::InvalidParameter(format!(
            "'{BRIGHTNESS_PARAM}' must be an integer between 0 and {MAX_BRIGHTNESS}, got {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lutron_core::{LightState, RawDeviceState};
    use serde_json::json;

    fn off() -> LightAttributes {
        LightAttributes::from_raw(&RawDeviceState::level(0))
    }

    #[test]
    fn test_turn_on_without_brightness() {
        assert_eq!(
            resolve(Command::TurnOn, None, &off()),
            Ok(BridgeCommand::TurnOn)
        );
    }

    #[test]
    fn test_turn_on_with_brightness_scales() {
        let params = json!({"brightness": 255});
        assert_eq!(
            resolve(Command::TurnOn, Some(&params), &off()),
            Ok(BridgeCommand::SetValue(100))
        );
    }

    #[test]
    fn test_set_brightness_zero_turns_off() {
        let params = json!({"brightness": 0});
        assert_eq!(
            resolve(Command::SetBrightness, Some(&params), &off()),
            Ok(BridgeCommand::TurnOff)
        );
    }

    #[test]
    fn test_set_brightness_requires_value() {
        assert!(matches!(
            resolve(Command::SetBrightness, Some(&json!({})), &off()),
            Err(MapperError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_brightness_out_of_range() {
        for params in [json!({"brightness": 256}), json!({"brightness": -1}), json!({"brightness": "high"})] {
            assert!(matches!(
                resolve(Command::SetBrightness, Some(&params), &off()),
                Err(MapperError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_toggle_follows_current_state() {
        let on = LightAttributes {
            state: LightState::On,
            brightness: 200,
        };
        assert_eq!(
            resolve(Command::Toggle, None, &on),
            Ok(BridgeCommand::TurnOff)
        );
        assert_eq!(
            resolve(Command::Toggle, None, &off()),
            Ok(BridgeCommand::TurnOn)
        );
    }
}
