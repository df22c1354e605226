//! Ground probing.
//!
//! Terrain and collision geometry live outside this crate. Motion only needs a
//! yes/no answer to "does a sphere of this radius at this point overlap ground",
//! which is what [`GroundProbe`] provides.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Opaque ground query supplied by the host's collision layer.
///
/// Implementations must be deterministic for a given world state so that
/// ticks replay identically.
pub trait GroundProbe: Send + Sync {
    /// Returns true if a sphere at `center` with `radius` overlaps
    /// ground-tagged geometry.
    fn overlaps_ground(&self, center: Vec3, radius: f32) -> bool;
}

/// Where the probe sphere sits relative to the entity origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundProbeConfig {
    /// Sphere radius.
    pub radius: f32,
    /// Offset from the entity position to the sphere center.
    pub offset: Vec3,
}

impl GroundProbeConfig {
    /// Returns the probe sphere center for an entity at `position`.
    #[must_use]
    pub fn center(&self, position: Vec3) -> Vec3 {
        position + self.offset
    }
}

impl Default for GroundProbeConfig {
    fn default() -> Self {
        Self {
            radius: 0.2,
            offset: Vec3::new(0.0, 0.1, 0.0),
        }
    }
}

/// An infinite horizontal ground plane at a fixed height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatGround {
    /// World-space height of the plane.
    pub height: f32,
}

impl FlatGround {
    /// Creates a ground plane at `height`.
    #[must_use]
    pub const fn new(height: f32) -> Self {
        Self { height }
    }
}

impl GroundProbe for FlatGround {
    fn overlaps_ground(&self, center: Vec3, radius: f32) -> bool {
        center.y - radius <= self.height
    }
}

/// A world with no ground at all. Everything falls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoGround;

impl GroundProbe for NoGround {
    fn overlaps_ground(&self, _center: Vec3, _radius: f32) -> bool {
        false
    }
}
