//! Frame fan-out to viewers
//!
//! Backed by a tokio broadcast channel: every subscriber has its own bounded
//! window of frames. A subscriber that falls behind loses its oldest frames
//! and resumes with the newest; the publisher never waits on anyone.

use bytes::Bytes;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FrameBroadcaster {
    tx: broadcast::Sender<Bytes>,
}

impl FrameBroadcaster {
    /// `capacity` frames are buffered per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver a frame to every current subscriber. Returns how many received it.
    pub fn publish(&self, frame: Bytes) -> usize {
        // An error only means nobody is watching
        self.tx.send(frame).unwrap_or(0)
    }

    /// Register a viewer. Only frames published from now on are seen.
    /// Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> FrameSubscription {
        FrameSubscription {
            rx: self.tx.subscribe(),
            skipped: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FrameBroadcaster {
    fn default() -> Self {
        Self::new(16)
    }
}

pub struct FrameSubscription {
    rx: broadcast::Receiver<Bytes>,
    skipped: u64,
}

impl FrameSubscription {
    /// Next frame in publish order, skipping whatever was dropped while this
    /// viewer lagged. `None` once the broadcaster is gone.
    pub async fn next(&mut self) -> Option<Bytes> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(RecvError::Lagged(n)) => {
                    debug!("viewer lagged, skipped {} frames", n);
                    self.skipped += n;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Frames dropped for this viewer so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
