//! Autonomous patrol
//!
//! A single-permit semaphore guarantees at most one running cycle. Each cycle
//! owns a fresh cancellation channel, so a stop request can only ever reach
//! the cycle it was meant for.

use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::Serialize;
use skypilot_core::{Direction, LinkHandle, Maneuver, VehicleState};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Move issued after the hover on each tick; the route repeats every five ticks
pub const PATROL_ROUTE: [Option<Direction>; 5] = [
    None,
    Some(Direction::Forward),
    Some(Direction::Right),
    Some(Direction::Backward),
    Some(Direction::Left),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatrolStats {
    pub cycles_started: u64,
    pub active_cycles: usize,
    pub peak_active_cycles: usize,
}

#[derive(Default)]
struct CycleCounters {
    started: AtomicU64,
    // Spawned cycle tasks, including those still queued on the permit
    live: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

pub struct PatrolController {
    link: LinkHandle,
    state: Arc<VehicleState>,
    interval: Duration,
    permit: Arc<Semaphore>,
    cancel: Mutex<Option<mpsc::Sender<()>>>,
    counters: Arc<CycleCounters>,
}

impl PatrolController {
    pub fn new(link: LinkHandle, state: Arc<VehicleState>, interval: Duration) -> Self {
        Self {
            link,
            state,
            interval,
            permit: Arc::new(Semaphore::new(1)),
            cancel: Mutex::new(None),
            counters: Arc::new(CycleCounters::default()),
        }
    }

    /// Start a patrol cycle unless one is already running.
    ///
    /// A cycle that was just stopped may still be issuing its final hover;
    /// the new cycle queues behind it on the permit. Returns `true` if this
    /// call started the cycle.
    pub fn start(&self) -> bool {
        let mut cancel = self.cancel.lock();
        if cancel.is_some() {
            debug!("patrol already running");
            return false;
        }

        let (quit_tx, quit_rx) = mpsc::channel(1);
        *cancel = Some(quit_tx);
        self.state.set_patrolling(true);
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        counter!("skypilot_patrol_cycles_started_total").increment(1);

        let link = self.link.clone();
        let state = self.state.clone();
        let interval = self.interval;
        let permit = self.permit.clone();
        let counters = self.counters.clone();
        counters.live.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            // Closed only if the controller is gone
            if let Ok(permit) = permit.acquire_owned().await {
                run_cycle(link, state, interval, permit, quit_rx, counters.clone()).await;
            }
            counters.live.fetch_sub(1, Ordering::SeqCst);
        });
        true
    }

    /// Ask the running cycle to stop. No-op when idle.
    ///
    /// Returns `true` if a cycle was signalled. The cycle finishes on its own
    /// task; this never waits for it.
    pub fn stop(&self) -> bool {
        let quit = self.cancel.lock().take();
        match quit {
            Some(quit) => {
                // Capacity 1 and a single sender: try_send cannot find the buffer full
                let _ = quit.try_send(());
                self.state.set_patrolling(false);
                true
            }
            None => false,
        }
    }

    /// Start when idle, stop when running. Returns `true` if a cycle was started.
    pub fn toggle(&self) -> bool {
        if self.start() {
            true
        } else {
            self.stop();
            false
        }
    }

    /// Whether a cycle is requested, running or still winding down
    pub fn is_running(&self) -> bool {
        self.counters.live.load(Ordering::SeqCst) > 0
    }

    pub fn stats(&self) -> PatrolStats {
        PatrolStats {
            cycles_started: self.counters.started.load(Ordering::SeqCst),
            active_cycles: self.counters.active.load(Ordering::SeqCst),
            peak_active_cycles: self.counters.peak.load(Ordering::SeqCst),
        }
    }
}

async fn run_cycle(
    link: LinkHandle,
    state: Arc<VehicleState>,
    interval: Duration,
    permit: OwnedSemaphorePermit,
    mut quit: mpsc::Receiver<()>,
    counters: Arc<CycleCounters>,
) {
    let active = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
    counters.peak.fetch_max(active, Ordering::SeqCst);
    gauge!("skypilot_patrol_active_cycles").set(active as f64);
    info!("patrol started, interval {:?}", interval);

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut step = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                link.hover().await;
                if let Some(direction) = PATROL_ROUTE[step] {
                    link.issue(Maneuver::moving(direction, state.speed())).await;
                }
                step = (step + 1) % PATROL_ROUTE.len();
            }
            signal = quit.recv() => {
                // A dropped sender means the controller is gone
                if signal.is_none() {
                    state.set_patrolling(false);
                }
                break;
            }
        }
    }

    link.hover().await;
    let active = counters.active.fetch_sub(1, Ordering::SeqCst) - 1;
    gauge!("skypilot_patrol_active_cycles").set(active as f64);
    info!("patrol stopped");
    drop(permit);
}
