//! External transcoder process
//!
//! Compressed video packets go in on stdin, raw BGR24 frames come out on
//! stdout.

use crate::config::TranscoderConfig;
use crate::error::VisionError;
use crate::source::RawStreamSource;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{info, warn};

pub struct Transcoder {
    child: Child,
}

/// Write half of the transcoder: accepts compressed video packets
pub struct PacketSink {
    stdin: ChildStdin,
}

impl Transcoder {
    /// Start the transcoder. The process is killed when the handle is dropped.
    pub fn spawn(
        config: &TranscoderConfig,
    ) -> Result<(Self, PacketSink, RawStreamSource<ChildStdout>), VisionError> {
        config.validate().map_err(VisionError::Config)?;

        let mut child = Command::new(&config.program)
            .args(config.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                VisionError::Transcoder(format!("failed to start {}: {}", config.program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VisionError::Transcoder("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VisionError::Transcoder("stdout not captured".to_string()))?;

        info!("transcoder started: {} (pid {:?})", config.program, child.id());
        Ok((
            Self { child },
            PacketSink { stdin },
            RawStreamSource::new(stdout),
        ))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the process and reap it
    pub async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("failed to stop transcoder: {}", e);
        }
    }
}

impl PacketSink {
    pub async fn write_packet(&mut self, packet: &[u8]) -> Result<(), VisionError> {
        self.stdin.write_all(packet).await?;
        Ok(())
    }
}
