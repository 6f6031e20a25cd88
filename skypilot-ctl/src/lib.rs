//! skypilot-ctl: flight control for SkyPilot
//!
//! Provides:
//! - Parsing of the web client's textual commands
//! - A dispatcher mapping each command onto one link call or state change
//! - A single-instance autonomous patrol cycle

pub mod error;
pub mod command;
pub mod dispatcher;
pub mod patrol;

pub use error::ControlError;
pub use command::{parse_speed, try_parse_speed, Command};
pub use dispatcher::{CommandDispatcher, DispatchOutcome, STATUS_NOT_FOUND, STATUS_OK};
pub use patrol::{PatrolController, PatrolStats, PATROL_ROUTE};
