//! Face tracker
//!
//! Stateless proportional dead-band control: each detected face is turned into
//! the moves that would bring it back to the middle of the frame at a
//! comfortable distance. Thresholds and speeds are fixed and independent of
//! the commanded vehicle speed.

use crate::frame::{BoundingBox, FRAME_AREA, FRAME_CENTER_X, FRAME_CENTER_Y};
use serde::Serialize;
use skypilot_core::{Direction, Maneuver};

/// Horizontal dead-band, pixels
pub const X_DEADBAND: i32 = 20;
/// Vertical dead-band, pixels
pub const Y_DEADBAND: i32 = 30;
/// Face area above this share of the frame (percent) is too close
pub const MAX_AREA_PERCENT: f64 = 7.0;
/// Face area below this share of the frame (percent) is too far
pub const MIN_AREA_PERCENT: f64 = 0.9;

pub const LATERAL_SPEED: u8 = 15;
pub const VERTICAL_SPEED: u8 = 25;
pub const DEPTH_SPEED: u8 = 10;

/// Where a face sits relative to the frame center
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceOffset {
    /// Frame center x minus face center x; negative when the face is right of center
    pub diff_x: i32,
    /// Frame center y minus face center y; negative when the face is below center
    pub diff_y: i32,
    /// Face area as a percentage of the frame, rounded to a whole number
    pub percent_area: f64,
}

pub fn measure(face: &BoundingBox) -> FaceOffset {
    let (cx, cy) = face.center();
    FaceOffset {
        diff_x: FRAME_CENTER_X - cx,
        diff_y: FRAME_CENTER_Y - cy,
        percent_area: (100.0 * face.area() as f64 / FRAME_AREA as f64).round(),
    }
}

/// Moves for one offset. Rules are evaluated independently, so up to one
/// lateral, one vertical and one depth move can fire together. A lone Hover
/// is returned when the face is already framed.
pub fn corrections(offset: &FaceOffset) -> Vec<Maneuver> {
    let mut moves = Vec::with_capacity(3);

    if offset.diff_x < -X_DEADBAND {
        moves.push(Maneuver::moving(Direction::Right, LATERAL_SPEED));
    }
    if offset.diff_x > X_DEADBAND {
        moves.push(Maneuver::moving(Direction::Left, LATERAL_SPEED));
    }
    if offset.diff_y < -Y_DEADBAND {
        moves.push(Maneuver::moving(Direction::Down, VERTICAL_SPEED));
    }
    if offset.diff_y > Y_DEADBAND {
        moves.push(Maneuver::moving(Direction::Up, VERTICAL_SPEED));
    }
    if offset.percent_area > MAX_AREA_PERCENT {
        moves.push(Maneuver::moving(Direction::Backward, DEPTH_SPEED));
    }
    if offset.percent_area < MIN_AREA_PERCENT {
        moves.push(Maneuver::moving(Direction::Forward, DEPTH_SPEED));
    }

    if moves.is_empty() {
        moves.push(Maneuver::Hover);
    }
    moves
}

pub fn track(face: &BoundingBox) -> Vec<Maneuver> {
    corrections(&measure(face))
}
