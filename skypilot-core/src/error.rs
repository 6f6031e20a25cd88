//! Error types for skypilot-core

use crate::lifecycle::LinkState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Link error: {0}")]
    Link(String),

    #[error("Link not connected")]
    NotConnected,

    #[error("Invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition { from: LinkState, to: LinkState },

    #[error("Vehicle not ready: {0:?} not reached within {1}ms")]
    ReadinessTimeout(LinkState, u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PilotError>;
