//! Component structs carried by every entity.
//!
//! Motion state lives in `riftcast-motion`; this module holds the combat side
//! (health, team, resource pools) and the base stats the default formula
//! provider reads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Team
// =============================================================================

/// Team affiliation. Entities on the same team are friendly to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(u32);

impl TeamId {
    /// Creates a team identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team:{}", self.0)
    }
}

impl From<u32> for TeamId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Spendable resource kinds.
///
/// `Health` is not a pool: spending it draws directly from
/// [`CombatState::health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Magical energy.
    Mana,
    /// Physical endurance.
    Stamina,
    /// Generic energy bar.
    Energy,
    /// Hit points.
    Health,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mana => write!(f, "mana"),
            Self::Stamina => write!(f, "stamina"),
            Self::Energy => write!(f, "energy"),
            Self::Health => write!(f, "health"),
        }
    }
}

/// A bounded resource pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    /// Current amount.
    pub current: f32,
    /// Upper bound.
    pub max: f32,
}

impl ResourcePool {
    /// Creates a full pool.
    #[must_use]
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Deducts `amount`, saturating at zero. Returns the amount actually
    /// deducted.
    pub fn spend(&mut self, amount: f32) -> f32 {
        let spent = amount.min(self.current).max(0.0);
        self.current -= spent;
        spent
    }
}

// =============================================================================
// Combat State
// =============================================================================

/// Health, team and resource pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    /// Current health. The entity is alive while this is positive.
    pub health: f32,
    /// Health cap applied by healing.
    pub max_health: f32,
    /// Team affiliation.
    pub team: TeamId,
    /// Spendable pools keyed by kind (never contains `Health`).
    pub resources: BTreeMap<ResourceKind, ResourcePool>,
}

impl CombatState {
    /// Creates a combat state at full health with no resource pools.
    #[must_use]
    pub fn new(max_health: f32, team: TeamId) -> Self {
        Self {
            health: max_health,
            max_health,
            team,
            resources: BTreeMap::new(),
        }
    }

    /// Adds a full pool of `kind` (builder style).
    #[must_use]
    pub fn with_pool(mut self, kind: ResourceKind, max: f32) -> Self {
        if kind != ResourceKind::Health {
            self.resources.insert(kind, ResourcePool::full(max));
        }
        self
    }

    /// Returns true while health is positive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Amount of `kind` currently available.
    #[must_use]
    pub fn available(&self, kind: ResourceKind) -> f32 {
        match kind {
            ResourceKind::Health => self.health.max(0.0),
            _ => self.resources.get(&kind).map_or(0.0, |pool| pool.current),
        }
    }

    /// Returns true if `amount` of `kind` can be paid.
    #[must_use]
    pub fn can_afford(&self, kind: ResourceKind, amount: f32) -> bool {
        self.available(kind) >= amount
    }

    /// Deducts `amount` of `kind`, saturating at zero. Returns the amount
    /// actually deducted.
    pub fn spend(&mut self, kind: ResourceKind, amount: f32) -> f32 {
        match kind {
            ResourceKind::Health => {
                let spent = amount.min(self.health.max(0.0)).max(0.0);
                self.health -= spent;
                spent
            }
            _ => self
                .resources
                .get_mut(&kind)
                .map_or(0.0, |pool| pool.spend(amount)),
        }
    }

    /// Reduces health, clamping at zero.
    pub fn damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }

    /// Restores health up to `max_health`. Dead entities are not revived.
    pub fn heal(&mut self, amount: f32) {
        if self.is_alive() {
            self.health = (self.health + amount).min(self.max_health);
        }
    }
}

impl Default for CombatState {
    fn default() -> Self {
        Self::new(100.0, TeamId::default())
    }
}

// =============================================================================
// Character Stats
// =============================================================================

/// Base numbers read by the default formula provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterStats {
    /// Movement speed in units per second.
    pub move_speed: f32,
    /// Jump apex height.
    pub jump_height: f32,
    /// Turn rate in degrees per second.
    pub rotate_speed: f32,
    /// Multiplier on charge times (lower charges faster).
    pub charge_time_scale: f32,
    /// Extra potency gained at full charge (0.5 means 150%).
    pub charge_bonus: f32,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            jump_height: 2.0,
            rotate_speed: 360.0,
            charge_time_scale: 1.0,
            charge_bonus: 0.5,
        }
    }
}
