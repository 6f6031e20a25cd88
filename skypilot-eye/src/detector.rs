//! Face detection capability
//!
//! Detection itself is provided from outside the workspace; the pipeline only
//! sees [`FaceDetector`].

use crate::error::VisionError;
use crate::frame::{DetectionResult, Frame};
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Boxes around every face found in `frame`
    async fn detect(&self, frame: &Frame) -> Result<DetectionResult, VisionError>;
}

/// Detector that never finds anything, used when no classifier is installed
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

#[async_trait]
impl FaceDetector for NullDetector {
    async fn detect(&self, _frame: &Frame) -> Result<DetectionResult, VisionError> {
        Ok(Vec::new())
    }
}
