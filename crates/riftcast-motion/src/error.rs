//! Error types for motion operations.

use thiserror::Error;

/// Errors produced by motion operations that can fail on bad geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// No parabola at the requested angle passes through the target.
    ///
    /// Happens when `vertical - horizontal * tan(angle)` is zero or positive,
    /// i.e. the target sits on or above the launch line.
    #[error(
        "no ballistic arc at {angle_degrees} degrees reaches a target {vertical} up and {horizontal} across"
    )]
    DegenerateArc {
        /// Vertical distance from origin to target (positive is up).
        vertical: f32,
        /// Horizontal distance from origin to target.
        horizontal: f32,
        /// Requested launch angle in degrees.
        angle_degrees: f32,
    },

    /// The target has no horizontal separation from the origin.
    #[error("launch target is directly above or below the origin")]
    CoincidentTarget,

    /// Launch angles must lie strictly between 0 and 90 degrees.
    #[error("launch angle {0} is outside (0, 90) degrees")]
    InvalidAngle(f32),
}

/// Result type alias for motion operations.
pub type Result<T> = std::result::Result<T, MotionError>;
