//! Snapshot persistence

use crate::error::VisionError;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the always-overwritten copy of the most recent snapshot
pub const LATEST_SNAPSHOT: &str = "snapshot.jpg";

/// Writes each snapshot twice: a timestamped archive file and the latest copy
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_SNAPSHOT)
    }

    pub fn archive_path(&self, at: DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("{}.jpg", at.format("%Y-%m-%dT%H:%M:%S%:z")))
    }

    /// Write `jpeg` to both locations, creating the directory when missing.
    /// Returns the archive path.
    pub async fn write(&self, jpeg: &[u8]) -> Result<PathBuf, VisionError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let archive = self.archive_path(Local::now());
        tokio::fs::write(&archive, jpeg).await?;
        tokio::fs::write(self.latest_path(), jpeg).await?;

        info!("snapshot saved to {}", archive.display());
        Ok(archive)
    }
}
