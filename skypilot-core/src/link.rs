//! Vehicle link capability
//!
//! The wire protocol spoken to the aircraft lives outside this workspace.
//! Everything here talks to the vehicle through [`VehicleLink`], so a real
//! driver and the simulated [`crate::sim::RecordingLink`] are interchangeable.

use crate::error::PilotError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Translation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Backward,
}

/// Yaw rotation sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlipDirection {
    Front,
    Back,
    Left,
    Right,
}

/// A single motion primitive understood by the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Maneuver {
    TakeOff,
    /// Take off after being tossed by hand
    ThrowTakeOff,
    Land,
    Hover,
    CeaseRotation,
    /// Repeated up/down bouncing
    Bounce,
    Move { direction: Direction, speed: u8 },
    Rotate { rotation: Rotation, speed: u8 },
    Flip(FlipDirection),
}

impl Maneuver {
    pub fn moving(direction: Direction, speed: u8) -> Self {
        Maneuver::Move { direction, speed }
    }

    pub fn rotating(rotation: Rotation, speed: u8) -> Self {
        Maneuver::Rotate { rotation, speed }
    }
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maneuver::Move { direction, speed } => write!(f, "{:?}({})", direction, speed),
            Maneuver::Rotate { rotation, speed } => write!(f, "{:?}({})", rotation, speed),
            Maneuver::Flip(side) => write!(f, "{:?}Flip", side),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Camera control requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCommand {
    /// Ask the vehicle to (keep) sending its video stream
    Start,
    /// Let the vehicle pick its encoder bit rate
    EncoderRateAuto,
    /// Exposure compensation level
    Exposure(i8),
}

/// Notifications emitted by the link
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    /// One compressed video packet as received from the vehicle
    VideoPacket(Bytes),
    Disconnected,
}

/// Capability interface to the aircraft
#[async_trait]
pub trait VehicleLink: Send + Sync {
    /// Human readable link name, used in logs
    fn name(&self) -> &str;

    /// Send one motion primitive
    async fn execute(&self, maneuver: Maneuver) -> Result<(), PilotError>;

    /// Send one camera control request
    async fn video(&self, command: VideoCommand) -> Result<(), PilotError>;

    /// Subscribe to link events
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent>;
}

/// Shared handle that logs and swallows transient send failures
#[derive(Clone)]
pub struct LinkHandle {
    link: Arc<dyn VehicleLink>,
}

impl LinkHandle {
    pub fn new(link: Arc<dyn VehicleLink>) -> Self {
        Self { link }
    }

    pub fn name(&self) -> &str {
        self.link.name()
    }

    /// Issue a maneuver. Returns whether the link accepted it.
    pub async fn issue(&self, maneuver: Maneuver) -> bool {
        debug!("link={} maneuver={}", self.link.name(), maneuver);
        match self.link.execute(maneuver).await {
            Ok(()) => true,
            Err(e) => {
                warn!("link={} failed to send {}: {}", self.link.name(), maneuver, e);
                false
            }
        }
    }

    pub async fn hover(&self) -> bool {
        self.issue(Maneuver::Hover).await
    }

    pub async fn video(&self, command: VideoCommand) -> bool {
        match self.link.video(command).await {
            Ok(()) => true,
            Err(e) => {
                warn!("link={} video command {:?} failed: {}", self.link.name(), command, e);
                false
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.link.subscribe()
    }
}

impl fmt::Debug for LinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkHandle").field("link", &self.link.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingLink;

    #[test]
    fn test_maneuver_display() {
        assert_eq!(Maneuver::moving(Direction::Right, 15).to_string(), "Right(15)");
        assert_eq!(
            Maneuver::rotating(Rotation::CounterClockwise, 10).to_string(),
            "CounterClockwise(10)"
        );
        assert_eq!(Maneuver::Flip(FlipDirection::Back).to_string(), "BackFlip");
        assert_eq!(Maneuver::Hover.to_string(), "Hover");
    }

    #[tokio::test]
    async fn test_issue_records_maneuver() {
        let link = Arc::new(RecordingLink::new());
        let handle = LinkHandle::new(link.clone());

        assert!(handle.hover().await);
        assert!(handle.issue(Maneuver::moving(Direction::Up, 25)).await);

        assert_eq!(
            link.maneuvers(),
            vec![Maneuver::Hover, Maneuver::moving(Direction::Up, 25)]
        );
    }

    #[tokio::test]
    async fn test_issue_swallows_failure() {
        let link = Arc::new(RecordingLink::new());
        link.set_failing(true);
        let handle = LinkHandle::new(link.clone());

        assert!(!handle.issue(Maneuver::Land).await);
        assert!(!handle.video(VideoCommand::Start).await);
        assert!(link.maneuvers().is_empty());
    }
}
