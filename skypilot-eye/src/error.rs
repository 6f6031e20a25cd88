//! Error types for skypilot-eye

use skypilot_core::PilotError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Short frame read: expected {expected} bytes")]
    ShortRead { expected: usize },

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Transcoder error: {0}")]
    Transcoder(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<VisionError> for PilotError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Io(e) => PilotError::Io(e),
            VisionError::Config(msg) => PilotError::Config(msg),
            other => PilotError::Link(format!("Vision error: {}", other)),
        }
    }
}
