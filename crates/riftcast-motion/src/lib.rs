//! # Riftcast Motion
//!
//! Physical motion substrate for combat entities.
//!
//! This crate owns everything about how an entity moves through the world and
//! nothing about why it moves. Skill validity and cancellation in
//! `riftcast-core` are defined in terms of the state kept here:
//!
//! - **Grounding**: a ground probe at the entity's feet, re-evaluated every tick
//! - **Jumping**: a vertical impulse derived from a target jump height
//! - **Forced launches**: ballistic arcs that land on a chosen point
//! - **Rotation**: rate-limited turns and a restartable rotate-toward sequence
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec3;
//! use riftcast_motion::{FlatGround, GroundProbeConfig, MotionState, Transform};
//!
//! let mut transform = Transform::at_position(Vec3::ZERO);
//! let mut motion = MotionState::new(-9.8);
//! let ground = FlatGround::new(0.0);
//! let probe = GroundProbeConfig::default();
//!
//! motion.integrate(&mut transform, &ground, &probe, 1.0 / 60.0);
//! assert!(motion.is_grounded());
//!
//! assert!(motion.jump(2.0, 1));
//! assert!((motion.velocity().y - 6.26).abs() < 0.01);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ballistic;
pub mod error;
pub mod ground;
pub mod rotation;
pub mod state;
pub mod steering;

// Re-exports for convenience
pub use ballistic::{solve_launch, LaunchSolution};
pub use error::{MotionError, Result};
pub use ground::{FlatGround, GroundProbe, GroundProbeConfig, NoGround};
pub use rotation::{
    forward, horizontal, look_rotation, rotate_towards, RotateToward, RotationProgress,
    ROTATION_THRESHOLD_DEGREES,
};
pub use state::{MotionState, MoveRequest, MovementLocks};
pub use steering::Steering;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World placement of an entity.
///
/// Forward is `rotation * Vec3::Z` and up is `Vec3::Y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World position.
    pub position: Vec3,
    /// World orientation.
    pub rotation: Quat,
}

impl Transform {
    /// Creates a transform at `position` facing +Z.
    #[must_use]
    pub fn at_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Creates a transform at `position` facing along `direction`.
    ///
    /// Falls back to the identity rotation for a zero direction.
    #[must_use]
    pub fn facing(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            rotation: look_rotation(direction).unwrap_or(Quat::IDENTITY),
        }
    }

    /// Returns the unit forward vector.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        forward(self.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at_position(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transform_faces_positive_z() {
        let transform = Transform::default();
        assert!((transform.forward() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn facing_constructor_points_forward_along_direction() {
        let transform = Transform::facing(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert!((transform.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn facing_zero_direction_falls_back_to_identity() {
        let transform = Transform::facing(Vec3::ONE, Vec3::ZERO);
        assert_eq!(transform.rotation, Quat::IDENTITY);
        assert_eq!(transform.position, Vec3::ONE);
    }
}
