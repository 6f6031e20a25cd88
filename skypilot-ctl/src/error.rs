//! Error types for skypilot-ctl

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ControlError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid speed: {0}")]
    InvalidSpeed(String),
}
