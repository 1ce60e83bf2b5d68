//! Cover command resolution and movement tracking
//!
//! Covers expose no position. `toggle` is resolved from the last known
//! movement direction, falling back to the reported open/closed reading.

use lutron_bridge::BridgeCommand;
use lutron_core::{Command, RawDeviceState, COVER_OPEN_THRESHOLD};

use crate::error::{MapperError, MapperResult};

/// Direction a cover was last seen or told to move in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Opening,
    Closing,
}

/// Resolve a cover command into the bridge call that carries it out
pub(crate) fn resolve(
    command: Command,
    last_direction: Option<Direction>,
    current: &RawDeviceState,
) -> MapperResult<BridgeCommand> {
    match command {
        Command::Open => Ok(BridgeCommand::OpenCover),
        Command::Close => Ok(BridgeCommand::CloseCover),
        Command::Stop => Ok(BridgeCommand::StopCover),
        Command::Toggle => Ok(match toggle_target(last_direction, current) {
            Direction::Opening => BridgeCommand::OpenCover,
            Direction::Closing => BridgeCommand::CloseCover,
        }),
        Command::TurnOn | Command::TurnOff | Command::SetBrightness => {
            Err(MapperError::UnsupportedCommand {
                entity_id: String::new(),
                command: command.to_string(),
            })
        }
    }
}

/// The direction `toggle` moves a cover in
///
/// Reverses the last known movement; without one, closes an open cover and
/// opens a closed one.
pub fn toggle_target(last_direction: Option<Direction>, current: &RawDeviceState) -> Direction {
    match last_direction {
        Some(Direction::Opening) => Direction::Closing,
        Some(Direction::Closing) => Direction::Opening,
        None if current.level >= COVER_OPEN_THRESHOLD => Direction::Closing,
        None => Direction::Opening,
    }
}

/// The movement direction a successfully issued command implies
///
/// `stop` leaves the cover without a known direction.
pub(crate) fn issued_direction(command: BridgeCommand) -> Option<Direction> {
    match command {
        BridgeCommand::OpenCover => Some(Direction::Opening),
        BridgeCommand::CloseCover => Some(Direction::Closing),
        _ => None,
    }
}

/// Movement direction after the bridge reports a new level
pub(crate) fn observed_direction(
    previous: Option<Direction>,
    old_level: u8,
    new_level: u8,
) -> Option<Direction> {
    use std::cmp::Ordering;

    match new_level.cmp(&old_level) {
        Ordering::Greater => Some(Direction::Opening),
        Ordering::Less => Some(Direction::Closing),
        Ordering::Equal => previous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_without_direction_uses_position() {
        assert_eq!(
            toggle_target(None, &RawDeviceState::level(0)),
            Direction::Opening
        );
        assert_eq!(
            toggle_target(None, &RawDeviceState::level(100)),
            Direction::Closing
        );
    }

    #[test]
    fn test_toggle_reverses_last_direction() {
        let open = RawDeviceState::level(100);
        assert_eq!(
            toggle_target(Some(Direction::Closing), &open),
            Direction::Opening
        );
        assert_eq!(
            toggle_target(Some(Direction::Opening), &open),
            Direction::Closing
        );
    }

    #[test]
    fn test_observed_direction() {
        assert_eq!(observed_direction(None, 0, 40), Some(Direction::Opening));
        assert_eq!(
            observed_direction(Some(Direction::Opening), 80, 10),
            Some(Direction::Closing)
        );
        assert_eq!(
            observed_direction(Some(Direction::Closing), 10, 10),
            Some(Direction::Closing)
        );
    }

    #[test]
    fn test_light_commands_rejected() {
        assert!(matches!(
            resolve(Command::SetBrightness, None, &RawDeviceState::default()),
            Err(MapperError::UnsupportedCommand { .. })
        ));
    }

    #[test]
    fn test_stop_clears_direction() {
        assert_eq!(issued_direction(BridgeCommand::StopCover), None);
        assert_eq!(
            issued_direction(BridgeCommand::CloseCover),
            Some(Direction::Closing)
        );
    }
}
