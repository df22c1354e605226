//! Strategies for turning movement input into a world-space direction.
//!
//! Players steer relative to the camera, AI characters steer in world space,
//! and projectiles ignore steering input entirely and only follow their
//! ballistic velocity.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// How horizontal movement input maps to world movement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Steering {
    /// Input is already a world-space direction.
    #[default]
    World,
    /// Input is relative to a camera yawed by `yaw` radians about +Y.
    /// The vertical component of the input is dropped.
    CameraRelative {
        /// Camera yaw in radians.
        yaw: f32,
    },
    /// Input-driven movement is disabled.
    BallisticOnly,
}

impl Steering {
    /// Maps `input` to a world-space direction (not normalized).
    ///
    /// Returns `Vec3::ZERO` when this strategy does not accept input.
    #[must_use]
    pub fn world_direction(&self, input: Vec3) -> Vec3 {
        match self {
            Self::World => input,
            Self::CameraRelative { yaw } => {
                Quat::from_rotation_y(*yaw) * Vec3::new(input.x, 0.0, input.z)
            }
            Self::BallisticOnly => Vec3::ZERO,
        }
    }
}
