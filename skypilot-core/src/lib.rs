//! skypilot-core: shared building blocks for piloting one aircraft
//!
//! Provides:
//! - The `VehicleLink` capability and its motion primitives
//! - Atomic vehicle state shared by control and vision tasks
//! - The Disconnected/Connected/Streaming link lifecycle
//! - A recording link for dry runs and tests

pub mod error;
pub mod config;
pub mod link;
pub mod state;
pub mod lifecycle;
pub mod sim;

pub use error::{PilotError, Result};
pub use config::{PilotConfig, DEFAULT_SPEED, MAX_SPEED};
pub use link::{
    Direction, FlipDirection, LinkEvent, LinkHandle, Maneuver, Rotation, VehicleLink, VideoCommand,
};
pub use state::VehicleState;
pub use lifecycle::{LinkLifecycle, LinkState};
pub use sim::RecordingLink;
