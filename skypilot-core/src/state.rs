//! Shared vehicle state
//!
//! Read and written concurrently by the dispatcher, the patrol cycle and the
//! frame pipeline, so every field is atomic. The patrol flag is advisory;
//! the patrol permit is what guards the cycle.

use crate::config::DEFAULT_SPEED;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug)]
pub struct VehicleState {
    speed: AtomicU8,
    patrolling: AtomicBool,
    face_tracking: AtomicBool,
    snapshot_requested: AtomicBool,
    snapshot_taken: Notify,
}

impl VehicleState {
    pub fn new() -> Self {
        Self {
            speed: AtomicU8::new(DEFAULT_SPEED),
            patrolling: AtomicBool::new(false),
            face_tracking: AtomicBool::new(false),
            snapshot_requested: AtomicBool::new(false),
            snapshot_taken: Notify::new(),
        }
    }

    /// Current commanded throttle for manual and patrol moves
    pub fn speed(&self) -> u8 {
        self.speed.load(Ordering::SeqCst)
    }

    pub fn set_speed(&self, speed: u8) {
        self.speed.store(speed, Ordering::SeqCst);
    }

    pub fn is_patrolling(&self) -> bool {
        self.patrolling.load(Ordering::SeqCst)
    }

    pub fn set_patrolling(&self, patrolling: bool) {
        self.patrolling.store(patrolling, Ordering::SeqCst);
    }

    pub fn is_face_tracking(&self) -> bool {
        self.face_tracking.load(Ordering::SeqCst)
    }

    pub fn set_face_tracking(&self, enabled: bool) {
        self.face_tracking.store(enabled, Ordering::SeqCst);
    }

    pub fn snapshot_requested(&self) -> bool {
        self.snapshot_requested.load(Ordering::SeqCst)
    }

    /// Mark the pending snapshot as written and wake any waiter
    pub fn complete_snapshot(&self) {
        self.snapshot_requested.store(false, Ordering::SeqCst);
        self.snapshot_taken.notify_waiters();
    }

    /// Request a snapshot and wait for the pipeline to take it.
    ///
    /// Returns `true` if the pipeline cleared the request before `timeout`.
    /// The request is always cleared on return.
    pub async fn take_snapshot(&self, timeout: Duration) -> bool {
        self.snapshot_requested.store(true, Ordering::SeqCst);

        let taken = tokio::time::timeout(timeout, async {
            loop {
                // Registered before the flag check so a completion in between is not lost
                let notified = self.snapshot_taken.notified();
                if !self.snapshot_requested() {
                    break;
                }
                notified.await;
            }
        })
        .await
        .is_ok();

        if !taken {
            debug!("snapshot not taken within {:?}", timeout);
        }
        self.snapshot_requested.store(false, Ordering::SeqCst);
        taken
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::new()
    }
}
