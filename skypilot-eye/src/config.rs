//! Configuration for skypilot-eye

use crate::frame::{FRAME_HEIGHT, FRAME_WIDTH};
use serde::{Deserialize, Serialize};

/// External transcoder turning the vehicle's compressed video into raw frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// Program to run, looked up on `PATH` when not absolute
    pub program: String,
    /// Hardware acceleration arguments placed before the input
    pub hwaccel_args: Vec<String>,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            hwaccel_args: vec![
                "-hwaccel".to_string(),
                "auto".to_string(),
                "-hwaccel_device".to_string(),
                "opencl".to_string(),
            ],
        }
    }
}

impl TranscoderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("Transcoder program must not be empty".to_string());
        }
        Ok(())
    }

    /// Full argument list: compressed stream on stdin, BGR24 frames on stdout
    pub fn args(&self) -> Vec<String> {
        let mut args = self.hwaccel_args.clone();
        args.extend(
            [
                "-i".to_string(),
                "pipe:0".to_string(),
                "-pix_fmt".to_string(),
                "bgr24".to_string(),
                "-s".to_string(),
                format!("{}x{}", FRAME_WIDTH, FRAME_HEIGHT),
                "-f".to_string(),
                "rawvideo".to_string(),
                "pipe:1".to_string(),
            ],
        );
        args
    }
}
