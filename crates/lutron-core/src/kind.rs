//! Entity kinds and the commands each kind accepts
//!
//! The supported-command table is fixed per kind and checked before any
//! bridge call is made.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::device::DeviceDomain;

/// Commands a light entity accepts
pub static LIGHT_COMMANDS: &[Command] = &[
    Command::TurnOn,
    Command::TurnOff,
    Command::SetBrightness,
    Command::Toggle,
];

/// Commands a cover entity accepts
pub static COVER_COMMANDS: &[Command] = &[
    Command::Open,
    Command::Close,
    Command::Stop,
    Command::Toggle,
];

/// Kind of hub entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Light,
    Cover,
}

impl EntityKind {
    /// The entity id prefix for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Light => "light",
            EntityKind::Cover => "cover",
        }
    }

    /// Resolve the entity kind for a bridge domain, if it is exposed at all
    pub fn from_domain(domain: &DeviceDomain) -> Option<Self> {
        match domain {
            DeviceDomain::Light => Some(EntityKind::Light),
            DeviceDomain::Cover => Some(EntityKind::Cover),
            DeviceDomain::Other => None,
        }
    }

    /// Commands this kind accepts
    pub fn supported_commands(&self) -> &'static [Command] {
        match self {
            EntityKind::Light => LIGHT_COMMANDS,
            EntityKind::Cover => COVER_COMMANDS,
        }
    }

    /// Check whether a command is valid for this kind
    pub fn supports(&self, command: Command) -> bool {
        self.supported_commands().contains(&command)
    }
}

impl FromStr for EntityKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(EntityKind::Light),
            "cover" => Ok(EntityKind::Cover),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hub command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    TurnOn,
    TurnOff,
    SetBrightness,
    Open,
    Close,
    Stop,
    Toggle,
}

impl Command {
    /// Canonical command name
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::TurnOn => "turn_on",
            Command::TurnOff => "turn_off",
            Command::SetBrightness => "set_brightness",
            Command::Open => "open",
            Command::Close => "close",
            Command::Stop => "stop",
            Command::Toggle => "toggle",
        }
    }
}

impl FromStr for Command {
    type Err = ();

    /// Parse a hub command name
    ///
    /// The hub's short names (`on`, `off`, `up`, `down`) are accepted as
    /// aliases of the canonical names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "turn_on" | "on" => Ok(Command::TurnOn),
            "turn_off" | "off" => Ok(Command::TurnOff),
            "set_brightness" => Ok(Command::SetBrightness),
            "open" | "up" => Ok(Command::Open),
            "close" | "down" => Ok(Command::Close),
            "stop" => Ok(Command::Stop),
            "toggle" => Ok(Command::Toggle),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_table() {
        assert!(EntityKind::Light.supports(Command::SetBrightness));
        assert!(EntityKind::Light.supports(Command::Toggle));
        assert!(!EntityKind::Light.supports(Command::Open));
        assert!(!EntityKind::Light.supports(Command::Stop));

        assert!(EntityKind::Cover.supports(Command::Open));
        assert!(EntityKind::Cover.supports(Command::Toggle));
        assert!(!EntityKind::Cover.supports(Command::SetBrightness));
        assert!(!EntityKind::Cover.supports(Command::TurnOn));
    }

    #[test]
    fn test_command_aliases() {
        assert_eq!("on".parse::<Command>(), Ok(Command::TurnOn));
        assert_eq!("turn_off".parse::<Command>(), Ok(Command::TurnOff));
        assert_eq!("up".parse::<Command>(), Ok(Command::Open));
        assert_eq!("down".parse::<Command>(), Ok(Command::Close));
        assert!("dance".parse::<Command>().is_err());
    }

    #[test]
    fn test_kind_from_domain() {
        assert_eq!(
            EntityKind::from_domain(&DeviceDomain::Light),
            Some(EntityKind::Light)
        );
        assert_eq!(EntityKind::from_domain(&DeviceDomain::Other), None);
    }
}
