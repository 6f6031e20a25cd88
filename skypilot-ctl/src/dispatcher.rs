//! Command dispatcher
//!
//! Maps one textual command onto one vehicle link call or one state change.

use crate::command::{parse_speed, Command};
use crate::patrol::PatrolController;
use serde::Serialize;
use skypilot_core::{LinkHandle, Maneuver, VehicleState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const STATUS_OK: u16 = 200;
pub const STATUS_NOT_FOUND: u16 = 404;

/// Result returned to the API layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub result: String,
    pub code: u16,
}

impl DispatchOutcome {
    pub fn ok() -> Self {
        Self {
            result: "OK".to_string(),
            code: STATUS_OK,
        }
    }

    pub fn not_found() -> Self {
        Self {
            result: "Not found".to_string(),
            code: STATUS_NOT_FOUND,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == STATUS_OK
    }
}

pub struct CommandDispatcher {
    link: LinkHandle,
    state: Arc<VehicleState>,
    patrol: Arc<PatrolController>,
    snapshot_timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(
        link: LinkHandle,
        state: Arc<VehicleState>,
        patrol: Arc<PatrolController>,
        snapshot_timeout: Duration,
    ) -> Self {
        Self {
            link,
            state,
            patrol,
            snapshot_timeout,
        }
    }

    /// Dispatch a command by wire name. `param` is the optional numeric
    /// argument, only read by `speed`.
    pub async fn dispatch(&self, name: &str, param: Option<&str>) -> DispatchOutcome {
        info!("action=dispatch command={}", name);

        match name.parse::<Command>() {
            Ok(command) => {
                self.execute(command, param).await;
                DispatchOutcome::ok()
            }
            Err(e) => {
                warn!("action=dispatch {}", e);
                DispatchOutcome::not_found()
            }
        }
    }

    /// Run an already parsed command. Link failures are logged by the link
    /// handle and not reported to the caller.
    pub async fn execute(&self, command: Command, param: Option<&str>) {
        let speed = self.state.speed();
        match command {
            Command::CeaseRotation => {
                self.link.issue(Maneuver::CeaseRotation).await;
            }
            Command::TakeOff => {
                self.link.issue(Maneuver::TakeOff).await;
            }
            Command::Land => {
                self.link.issue(Maneuver::Land).await;
            }
            Command::Hover => {
                self.link.hover().await;
            }
            Command::Move(direction) => {
                self.link.issue(Maneuver::moving(direction, speed)).await;
            }
            Command::Rotate(rotation) => {
                self.link.issue(Maneuver::rotating(rotation, speed)).await;
            }
            Command::Flip(side) => {
                self.link.issue(Maneuver::Flip(side)).await;
            }
            Command::StartPatrol => {
                self.patrol.start();
            }
            Command::StopPatrol => {
                self.patrol.stop();
            }
            Command::ThrowTakeOff => {
                self.link.issue(Maneuver::ThrowTakeOff).await;
            }
            Command::Bounce => {
                self.link.issue(Maneuver::Bounce).await;
            }
            Command::Speed => {
                let speed = parse_speed(param);
                info!("speed set to {}", speed);
                self.state.set_speed(speed);
            }
            Command::StartFaceTracking => {
                self.state.set_face_tracking(true);
            }
            Command::StopFaceTracking => {
                self.state.set_face_tracking(false);
                self.link.hover().await;
            }
            Command::Snapshot => {
                if !self.state.take_snapshot(self.snapshot_timeout).await {
                    warn!("snapshot not taken within {:?}", self.snapshot_timeout);
                }
            }
        }
    }

    pub fn state(&self) -> &Arc<VehicleState> {
        &self.state
    }

    pub fn patrol(&self) -> &Arc<PatrolController> {
        &self.patrol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(DispatchOutcome::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"result": "OK", "code": 200}));

        let json = serde_json::to_value(DispatchOutcome::not_found()).unwrap();
        assert_eq!(json, serde_json::json!({"result": "Not found", "code": 404}));
    }

    #[test]
    fn test_outcome_is_ok() {
        assert!(DispatchOutcome::ok().is_ok());
        assert!(!DispatchOutcome::not_found().is_ok());
    }
}
