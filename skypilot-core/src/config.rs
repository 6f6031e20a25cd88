//! Configuration for skypilot-core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Throttle used for manual moves until a `speed` command says otherwise
pub const DEFAULT_SPEED: u8 = 10;

/// Highest throttle the vehicle accepts
pub const MAX_SPEED: u8 = 100;

/// Pilot session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Interval between patrol ticks in milliseconds
    pub patrol_interval_ms: u64,
    /// How long `take_snapshot` waits for the pipeline in milliseconds
    pub snapshot_timeout_ms: u64,
    /// How long to wait for the vehicle to report ready in milliseconds
    pub ready_timeout_ms: u64,
    /// Interval at which start-video is re-issued while connected
    pub video_keepalive_ms: u64,
    /// Directory receiving snapshot files
    pub snapshot_dir: PathBuf,
    /// JPEG quality for broadcast frames and snapshots (1-100)
    pub jpeg_quality: u8,
    /// Frames buffered per viewer before the oldest is dropped
    pub broadcast_capacity: usize,
    /// Pause after a failed frame read in milliseconds
    pub read_retry_delay_ms: u64,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            patrol_interval_ms: 3000,
            snapshot_timeout_ms: 2000,
            ready_timeout_ms: 5000,
            video_keepalive_ms: 100,
            snapshot_dir: PathBuf::from("./static/img/snapshots"),
            jpeg_quality: 90,
            broadcast_capacity: 16,
            read_retry_delay_ms: 100,
        }
    }
}

impl PilotConfig {
    pub fn patrol_interval(&self) -> Duration {
        Duration::from_millis(self.patrol_interval_ms)
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn video_keepalive(&self) -> Duration {
        Duration::from_millis(self.video_keepalive_ms)
    }

    pub fn read_retry_delay(&self) -> Duration {
        Duration::from_millis(self.read_retry_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.patrol_interval_ms == 0 {
            return Err("Patrol interval must be greater than 0".to_string());
        }

        if self.snapshot_timeout_ms == 0 {
            return Err("Snapshot timeout must be greater than 0".to_string());
        }

        if self.video_keepalive_ms == 0 {
            return Err("Video keep-alive interval must be greater than 0".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }

        if self.broadcast_capacity == 0 {
            return Err("Broadcast capacity must be greater than 0".to_string());
        }

        if self.snapshot_dir.as_os_str().is_empty() {
            return Err("Snapshot directory must not be empty".to_string());
        }

        Ok(())
    }
}
