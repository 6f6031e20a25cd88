//! Simulated vehicle link
//!
//! Records every request instead of flying. Used for dry runs of the server
//! and by the tests of every crate in the workspace.

use crate::error::PilotError;
use crate::link::{LinkEvent, Maneuver, VehicleLink, VideoCommand};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::info;

const EVENT_BUFFER_SIZE: usize = 256;

pub struct RecordingLink {
    maneuvers: Mutex<Vec<Maneuver>>,
    video_commands: Mutex<Vec<VideoCommand>>,
    failing: AtomicBool,
    events: broadcast::Sender<LinkEvent>,
}

impl RecordingLink {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            maneuvers: Mutex::new(Vec::new()),
            video_commands: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            events,
        }
    }

    /// Make every subsequent request fail with a link error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Emit an event to all subscribers, as a real driver would on the wire
    pub fn emit(&self, event: LinkEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn maneuvers(&self) -> Vec<Maneuver> {
        self.maneuvers.lock().clone()
    }

    pub fn video_commands(&self) -> Vec<VideoCommand> {
        self.video_commands.lock().clone()
    }

    pub fn count(&self, maneuver: Maneuver) -> usize {
        self.maneuvers.lock().iter().filter(|m| **m == maneuver).count()
    }

    pub fn last(&self) -> Option<Maneuver> {
        self.maneuvers.lock().last().copied()
    }

    pub fn clear(&self) {
        self.maneuvers.lock().clear();
        self.video_commands.lock().clear();
    }
}

impl Default for RecordingLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VehicleLink for RecordingLink {
    fn name(&self) -> &str {
        "sim"
    }

    async fn execute(&self, maneuver: Maneuver) -> Result<(), PilotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PilotError::Link(format!("simulated failure sending {}", maneuver)));
        }
        info!("sim: {}", maneuver);
        self.maneuvers.lock().push(maneuver);
        Ok(())
    }

    async fn video(&self, command: VideoCommand) -> Result<(), PilotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PilotError::Link(format!("simulated failure sending {:?}", command)));
        }
        self.video_commands.lock().push(command);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let link = RecordingLink::new();
        let mut events = link.subscribe();

        link.emit(LinkEvent::Connected);
        link.emit(LinkEvent::VideoPacket(Bytes::from_static(b"\x00\x00\x01")));

        assert_eq!(events.recv().await.unwrap(), LinkEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            LinkEvent::VideoPacket(Bytes::from_static(b"\x00\x00\x01"))
        );
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let link = RecordingLink::new();
        link.emit(LinkEvent::Disconnected);
    }

    #[tokio::test]
    async fn test_count_and_clear() {
        let link = RecordingLink::new();
        link.execute(Maneuver::Hover).await.unwrap();
        link.execute(Maneuver::Hover).await.unwrap();
        link.execute(Maneuver::Land).await.unwrap();
        link.video(VideoCommand::Start).await.unwrap();

        assert_eq!(link.count(Maneuver::Hover), 2);
        assert_eq!(link.last(), Some(Maneuver::Land));
        assert_eq!(link.video_commands(), vec![VideoCommand::Start]);

        link.clear();
        assert!(link.maneuvers().is_empty());
        assert!(link.video_commands().is_empty());
    }
}
