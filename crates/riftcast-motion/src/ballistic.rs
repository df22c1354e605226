//! Ballistic launch solver.
//!
//! Given an origin, a target and a launch angle, finds the launch speed that
//! carries a body under constant gravity through the target. With horizontal
//! distance `D`, vertical distance `H` (positive is up), angle `θ` and signed
//! gravity `g` (negative is down):
//!
//! ```text
//! lateral  = sqrt(g·D² / (2·(H − D·tanθ)))
//! vertical = tanθ · lateral
//! ```
//!
//! The radicand is only positive when `H − D·tanθ < 0`, meaning the target
//! lies below the line leaving the origin at angle `θ`. Everything else is
//! reported as [`MotionError::DegenerateArc`] instead of yielding NaN.

use glam::Vec3;

use crate::error::{MotionError, Result};
use crate::rotation::horizontal;

/// Horizontal separations below this are treated as "straight up/down".
const MIN_HORIZONTAL_DISTANCE: f32 = 1e-4;

/// Launch parameters in the frame facing the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchSolution {
    /// Unit horizontal direction from origin to target.
    pub heading: Vec3,
    /// Speed along `heading`.
    pub lateral_speed: f32,
    /// Upward speed.
    pub vertical_speed: f32,
}

impl LaunchSolution {
    /// Launch velocity in the facing frame, `(0, vertical, lateral)`.
    #[must_use]
    pub fn local_velocity(&self) -> Vec3 {
        Vec3::new(0.0, self.vertical_speed, self.lateral_speed)
    }

    /// Launch velocity in world space.
    #[must_use]
    pub fn world_velocity(&self) -> Vec3 {
        self.heading * self.lateral_speed + Vec3::Y * self.vertical_speed
    }
}

/// Solves for the launch that carries a body from `origin` to `target`.
///
/// # Errors
///
/// - [`MotionError::InvalidAngle`] if the angle is not in (0, 90) degrees
/// - [`MotionError::CoincidentTarget`] if the target has no horizontal offset
/// - [`MotionError::DegenerateArc`] if no arc at this angle reaches the target
pub fn solve_launch(
    origin: Vec3,
    target: Vec3,
    angle_degrees: f32,
    gravity: f32,
) -> Result<LaunchSolution> {
    if !(angle_degrees > 0.0 && angle_degrees < 90.0) {
        return Err(MotionError::InvalidAngle(angle_degrees));
    }

    let delta = target - origin;
    let flat = horizontal(delta);
    let horizontal_distance = flat.length();
    if horizontal_distance < MIN_HORIZONTAL_DISTANCE {
        return Err(MotionError::CoincidentTarget);
    }
    let vertical_distance = delta.y;

    let tan_angle = angle_degrees.to_radians().tan();
    let denominator = vertical_distance - horizontal_distance * tan_angle;
    let radicand =
        gravity * horizontal_distance * horizontal_distance / (2.0 * denominator);

    if denominator >= 0.0 || !radicand.is_finite() || radicand <= 0.0 {
        return Err(MotionError::DegenerateArc {
            vertical: vertical_distance,
            horizontal: horizontal_distance,
            angle_degrees,
        });
    }

    let lateral_speed = radicand.sqrt();
    Ok(LaunchSolution {
        heading: flat / horizontal_distance,
        lateral_speed,
        vertical_speed: tan_angle * lateral_speed,
    })
}
