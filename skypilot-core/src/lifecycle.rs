//! Link lifecycle state machine
//!
//! Disconnected -> Connected -> Streaming, and back to Disconnected from any
//! state. Transitions are driven by explicit notifications so the startup
//! sequence can be exercised without hardware.

use crate::error::{PilotError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LinkState {
    Disconnected,
    Connected,
    Streaming,
}

impl LinkState {
    fn can_transition_to(self, to: LinkState) -> bool {
        matches!(
            (self, to),
            (LinkState::Disconnected, LinkState::Connected)
                | (LinkState::Connected, LinkState::Streaming)
                | (LinkState::Connected, LinkState::Disconnected)
                | (LinkState::Streaming, LinkState::Disconnected)
        )
    }
}

pub struct LinkLifecycle {
    state: watch::Sender<LinkState>,
}

impl LinkLifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self { state }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Move to `to`, returning the previous state.
    pub fn transition(&self, to: LinkState) -> Result<LinkState> {
        let mut outcome = Err(PilotError::InvalidTransition {
            from: LinkState::Disconnected,
            to,
        });
        self.state.send_if_modified(|current| {
            let from = *current;
            if from.can_transition_to(to) {
                *current = to;
                outcome = Ok(from);
                true
            } else {
                outcome = Err(PilotError::InvalidTransition { from, to });
                false
            }
        });

        if let Ok(from) = &outcome {
            info!("link lifecycle {:?} -> {:?}", from, to);
        }
        outcome
    }

    /// Watch state changes
    pub fn watch(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Wait until the lifecycle has reached at least `target`.
    pub async fn wait_until(&self, target: LinkState, timeout: Duration) -> Result<()> {
        let mut rx = self.state.subscribe();
        let outcome = match tokio::time::timeout(timeout, rx.wait_for(|state| *state >= target)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(PilotError::NotConnected),
            Err(_) => Err(PilotError::ReadinessTimeout(target, timeout.as_millis() as u64)),
        };
        outcome
    }

    /// Wait until the vehicle has connected
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        self.wait_until(LinkState::Connected, timeout).await
    }
}

impl Default for LinkLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
