//! Orientation helpers and the rotate-toward sequence.
//!
//! A [`RotateToward`] is the explicit, tick-driven form of "keep turning toward
//! this point until you face it". It stores where it is heading and is advanced
//! once per tick by [`MotionState::advance_rotation`](crate::MotionState::advance_rotation).
//! Starting a new one replaces the previous record, so at most one is in flight
//! per entity.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Remaining angle at or below which a rotate-toward sequence is finished.
pub const ROTATION_THRESHOLD_DEGREES: f32 = 0.5;

/// Directions shorter than this are treated as zero.
const DIRECTION_EPSILON: f32 = 1e-6;

/// Returns the unit forward vector for `rotation`.
#[must_use]
pub fn forward(rotation: Quat) -> Vec3 {
    rotation * Vec3::Z
}

/// Projects `v` onto the horizontal plane.
#[must_use]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Builds a roll-free rotation whose forward vector points along `direction`.
///
/// Returns `None` for a zero-length direction.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    if direction.length_squared() < DIRECTION_EPSILON {
        return None;
    }
    let dir = direction.normalize();
    let yaw = dir.x.atan2(dir.z);
    let pitch = (-dir.y).clamp(-1.0, 1.0).asin();
    Some(Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch))
}

/// Turns `from` toward `to` by at most `max_radians`.
#[must_use]
pub fn rotate_towards(from: Quat, to: Quat, max_radians: f32) -> Quat {
    if max_radians <= 0.0 {
        return from;
    }
    let angle = from.angle_between(to);
    if angle <= max_radians {
        to
    } else {
        from.slerp(to, max_radians / angle).normalize()
    }
}

/// An in-flight rotate-toward sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotateToward {
    /// World point to face. Only its horizontal direction matters.
    pub target: Vec3,
    /// Multiplier applied to the entity's rotate speed.
    pub multiplier: f32,
    /// Tick at which this sequence was started.
    pub started_tick: u64,
}

/// Result of advancing a rotate-toward sequence by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationProgress {
    /// No sequence is in flight.
    Idle,
    /// Still turning; the remaining angle in degrees.
    Turning(f32),
    /// The sequence reached its threshold and has ended.
    Finished,
}

/// Angle in degrees between the forward vector of `rotation` and the
/// horizontal direction toward `target`, or `None` if the target is directly
/// above or below.
#[must_use]
pub fn remaining_horizontal_angle(rotation: Quat, position: Vec3, target: Vec3) -> Option<f32> {
    let dir = horizontal(target - position);
    if dir.length_squared() < DIRECTION_EPSILON {
        return None;
    }
    Some(forward(rotation).angle_between(dir).to_degrees())
}
