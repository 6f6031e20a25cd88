//! Textual commands accepted from the web client

use crate::error::ControlError;
use skypilot_core::{Direction, FlipDirection, Rotation, DEFAULT_SPEED, MAX_SPEED};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    CeaseRotation,
    TakeOff,
    Land,
    Hover,
    Move(Direction),
    Rotate(Rotation),
    Flip(FlipDirection),
    StartPatrol,
    StopPatrol,
    ThrowTakeOff,
    Bounce,
    Speed,
    StartFaceTracking,
    StopFaceTracking,
    Snapshot,
}

impl Command {
    /// Every recognized command
    pub const ALL: [Command; 24] = [
        Command::CeaseRotation,
        Command::TakeOff,
        Command::Land,
        Command::Hover,
        Command::Move(Direction::Up),
        Command::Move(Direction::Down),
        Command::Move(Direction::Left),
        Command::Move(Direction::Right),
        Command::Move(Direction::Forward),
        Command::Move(Direction::Backward),
        Command::Rotate(Rotation::Clockwise),
        Command::Rotate(Rotation::CounterClockwise),
        Command::Flip(FlipDirection::Front),
        Command::Flip(FlipDirection::Back),
        Command::Flip(FlipDirection::Left),
        Command::Flip(FlipDirection::Right),
        Command::StartPatrol,
        Command::StopPatrol,
        Command::ThrowTakeOff,
        Command::Bounce,
        Command::Speed,
        Command::StartFaceTracking,
        Command::StopFaceTracking,
        Command::Snapshot,
    ];

    /// Wire name used by the web client
    pub fn name(&self) -> &'static str {
        match self {
            Command::CeaseRotation => "ceaseRotation",
            Command::TakeOff => "takeOff",
            Command::Land => "land",
            Command::Hover => "hover",
            Command::Move(Direction::Up) => "up",
            Command::Move(Direction::Down) => "down",
            Command::Move(Direction::Left) => "left",
            Command::Move(Direction::Right) => "right",
            Command::Move(Direction::Forward) => "forward",
            Command::Move(Direction::Backward) => "backward",
            Command::Rotate(Rotation::Clockwise) => "clockwise",
            Command::Rotate(Rotation::CounterClockwise) => "counterClockwise",
            Command::Flip(FlipDirection::Front) => "frontFlip",
            Command::Flip(FlipDirection::Back) => "backFlip",
            Command::Flip(FlipDirection::Left) => "leftFlip",
            Command::Flip(FlipDirection::Right) => "rightFlip",
            Command::StartPatrol => "patrol",
            Command::StopPatrol => "stopPatrol",
            Command::ThrowTakeOff => "throwTakeOff",
            Command::Bounce => "bounce",
            Command::Speed => "speed",
            Command::StartFaceTracking => "faceDetectTrack",
            Command::StopFaceTracking => "stopFaceDetectTrack",
            Command::Snapshot => "snapshot",
        }
    }
}

impl FromStr for Command {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older clients send the misspelled name
        if s == "caseRotation" {
            return Ok(Command::CeaseRotation);
        }
        Command::ALL
            .iter()
            .find(|command| command.name() == s)
            .copied()
            .ok_or_else(|| ControlError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a throttle value. Any integer is accepted and clamped to
/// `0..=MAX_SPEED`; anything else is rejected.
pub fn try_parse_speed(raw: &str) -> Result<u8, ControlError> {
    let speed = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ControlError::InvalidSpeed(raw.to_string()))?;
    Ok(speed.clamp(0, i64::from(MAX_SPEED)) as u8)
}

/// Parse a throttle value, falling back to the default speed
pub fn parse_speed(raw: Option<&str>) -> u8 {
    raw.and_then(|raw| try_parse_speed(raw).ok())
        .unwrap_or(DEFAULT_SPEED)
}
