//! Entity types for the combat simulation.
//!
//! - [`EntityId`]: unique, ordered identifier
//! - [`EntityTag`]: what kind of thing the entity is
//! - [`Entity`]: the full per-entity state (placement, motion, combat, stats)
//! - [`EntityInit`]: spawn parameters
//!
//! Cast state is deliberately not stored here. Each entity's
//! [`SkillExecutor`](crate::executor::SkillExecutor) lives in the simulation,
//! keyed by the same [`EntityId`].
//!
//! # Example
//!
//! ```
//! use riftcast_core::entity::{Entity, EntityId, EntityInit, EntityTag};
//!
//! let hero = Entity::new(EntityId::new(42), EntityTag::Character, EntityInit::default(), -9.81);
//!
//! assert_eq!(hero.id().as_u64(), 42);
//! assert!(hero.is_character());
//! assert!(hero.is_alive());
//! ```

pub mod components;

use glam::Vec3;
use riftcast_motion::{MotionState, Steering, Transform};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use components::{CharacterStats, CombatState, ResourceKind, ResourcePool, TeamId};

/// Unique identifier for an entity.
///
/// Entity IDs are ordered by their numeric value, which gives every
/// per-entity loop in the simulation a deterministic order.
///
/// # Example
///
/// ```
/// use riftcast_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Entity classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityTag {
    /// Player or AI controlled combatant.
    Character,
    /// In-flight object that only follows its ballistic velocity.
    Projectile,
}

impl EntityTag {
    /// Steering strategy an entity of this kind starts with.
    #[must_use]
    pub const fn default_steering(self) -> Steering {
        match self {
            Self::Character => Steering::World,
            Self::Projectile => Steering::BallisticOnly,
        }
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character => write!(f, "Character"),
            Self::Projectile => write!(f, "Projectile"),
        }
    }
}

/// Spawn parameters for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityInit {
    /// Initial placement.
    pub transform: Transform,
    /// Initial combat state.
    pub combat: CombatState,
    /// Base stats.
    pub stats: CharacterStats,
    /// Steering override. `None` uses the tag's default.
    pub steering: Option<Steering>,
    /// Gravity override. `None` uses the simulation's gravity.
    pub gravity: Option<f32>,
}

impl EntityInit {
    /// Spawn parameters at `position` facing +Z.
    #[must_use]
    pub fn at_position(position: Vec3) -> Self {
        Self {
            transform: Transform::at_position(position),
            ..Self::default()
        }
    }

    /// Sets the facing direction (builder style).
    #[must_use]
    pub fn facing(mut self, direction: Vec3) -> Self {
        self.transform = Transform::facing(self.transform.position, direction);
        self
    }

    /// Sets the combat state (builder style).
    #[must_use]
    pub fn with_combat(mut self, combat: CombatState) -> Self {
        self.combat = combat;
        self
    }

    /// Sets the base stats (builder style).
    #[must_use]
    pub fn with_stats(mut self, stats: CharacterStats) -> Self {
        self.stats = stats;
        self
    }

    /// Sets the team (builder style).
    #[must_use]
    pub fn on_team(mut self, team: TeamId) -> Self {
        self.combat.team = team;
        self
    }
}

impl Default for EntityInit {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            combat: CombatState::default(),
            stats: CharacterStats::default(),
            steering: None,
            gravity: None,
        }
    }
}

/// A complete entity in the combat simulation.
///
/// # Invariants
///
/// - The `EntityId` is unique within an arena
/// - `motion` and `transform` describe the same physical body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    tag: EntityTag,
    /// World placement.
    pub transform: Transform,
    /// Physical motion state.
    pub motion: MotionState,
    /// How movement input maps to world movement.
    pub steering: Steering,
    /// Health, team and resources.
    pub combat: CombatState,
    /// Base stats for formulas.
    pub stats: CharacterStats,
}

impl Entity {
    /// Creates an entity from spawn parameters. `default_gravity` applies
    /// unless `init` overrides it.
    #[must_use]
    pub fn new(id: EntityId, tag: EntityTag, init: EntityInit, default_gravity: f32) -> Self {
        Self {
            id,
            tag,
            transform: init.transform,
            motion: MotionState::new(init.gravity.unwrap_or(default_gravity)),
            steering: init.steering.unwrap_or_else(|| tag.default_steering()),
            combat: init.combat,
            stats: init.stats,
        }
    }

    /// Returns the entity's unique identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity's type tag.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        self.tag
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Unit forward vector.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }

    /// Returns `true` while health is positive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.combat.is_alive()
    }

    /// Returns `true` if this entity is a character.
    #[must_use]
    pub const fn is_character(&self) -> bool {
        matches!(self.tag, EntityTag::Character)
    }

    /// Returns `true` if this entity is a projectile.
    #[must_use]
    pub const fn is_projectile(&self) -> bool {
        matches!(self.tag, EntityTag::Projectile)
    }

    /// Returns `true` if `other` is on the same team.
    #[must_use]
    pub fn is_friendly_with(&self, other: &Entity) -> bool {
        self.combat.team == other.combat.team
    }
}
