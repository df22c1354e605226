//! Interfaces to systems outside the skill core.
//!
//! Stat formulas, status-effect bookkeeping, visibility and presentation are
//! owned by the host. The core only calls through these traits, each of which
//! ships with a simple built-in implementation.
//!
//! All collaborators are `Send + Sync`: executors query them from rayon
//! worker threads during the skill phase.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use glam::Vec3;
use riftcast_motion::{FlatGround, GroundProbe};

use crate::entity::{Entity, EntityId};
use crate::output::Event;
use crate::skill::{ChargeProfile, StatusEffectId, StatusGroupId};

// =============================================================================
// Formulas
// =============================================================================

/// Derived per-entity numbers.
pub trait Formulas: Send + Sync {
    /// Movement speed in world units per second.
    fn movement_speed(&self, entity: &Entity) -> f32;

    /// Jump apex height above the take-off point.
    fn jump_height(&self, entity: &Entity) -> f32;

    /// Turn rate in degrees per second.
    fn rotate_speed(&self, entity: &Entity) -> f32;

    /// Effective minimum charge time.
    fn required_charge_time(&self, entity: &Entity, profile: &ChargeProfile) -> f32;

    /// Effective full charge time.
    fn full_charge_time(&self, entity: &Entity, profile: &ChargeProfile) -> f32;

    /// Effect multiplier for a cast charged for `charged` seconds.
    ///
    /// Defaults to a linear ramp from 1 at the required time to
    /// `1 + charge_bonus` at the full time.
    fn charge_potency(&self, entity: &Entity, profile: &ChargeProfile, charged: f32) -> f32 {
        let required = self.required_charge_time(entity, profile);
        let full = self.full_charge_time(entity, profile);
        if full <= required {
            return 1.0;
        }
        let progress = ((charged - required) / (full - required)).clamp(0.0, 1.0);
        1.0 + entity.stats.charge_bonus * progress
    }
}

/// Formulas that read [`CharacterStats`](crate::entity::CharacterStats)
/// directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatFormulas;

impl Formulas for StatFormulas {
    fn movement_speed(&self, entity: &Entity) -> f32 {
        entity.stats.move_speed
    }

    fn jump_height(&self, entity: &Entity) -> f32 {
        entity.stats.jump_height
    }

    fn rotate_speed(&self, entity: &Entity) -> f32 {
        entity.stats.rotate_speed
    }

    fn required_charge_time(&self, entity: &Entity, profile: &ChargeProfile) -> f32 {
        profile.required_charge_time * entity.stats.charge_time_scale
    }

    fn full_charge_time(&self, entity: &Entity, profile: &ChargeProfile) -> f32 {
        profile.full_charge_time * entity.stats.charge_time_scale
    }
}

// =============================================================================
// Status Effects
// =============================================================================

/// Status-effect lookup.
pub trait StatusEffects: Send + Sync {
    /// Returns true if `entity` holds `effect` with at least `min_stacks`.
    fn has_effect(&self, entity: EntityId, effect: &StatusEffectId, min_stacks: u32) -> bool;

    /// Returns true if `entity` holds any effect belonging to `group`.
    fn has_group(&self, entity: EntityId, group: &StatusGroupId) -> bool;
}

#[derive(Debug, Default)]
struct StatusTableInner {
    stacks: BTreeMap<EntityId, BTreeMap<StatusEffectId, u32>>,
    groups: BTreeMap<StatusGroupId, BTreeSet<StatusEffectId>>,
}

/// In-memory status table the host updates between ticks.
///
/// # Example
///
/// ```
/// use riftcast_core::collab::{StatusEffects, StatusTable};
/// use riftcast_core::entity::EntityId;
/// use riftcast_core::skill::{StatusEffectId, StatusGroupId};
///
/// let table = StatusTable::new();
/// table.define_group("stance", ["guard"]);
/// table.set_stacks(EntityId::new(1), "guard", 2);
///
/// assert!(table.has_effect(EntityId::new(1), &StatusEffectId::new("guard"), 2));
/// assert!(table.has_group(EntityId::new(1), &StatusGroupId::new("stance")));
/// ```
#[derive(Debug, Default)]
pub struct StatusTable {
    inner: RwLock<StatusTableInner>,
}

impl StatusTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stack count of an effect. Zero removes it.
    pub fn set_stacks(&self, entity: EntityId, effect: impl Into<String>, stacks: u32) {
        let effect = StatusEffectId::new(effect);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let held = inner.stacks.entry(entity).or_default();
        if stacks == 0 {
            held.remove(&effect);
        } else {
            held.insert(effect, stacks);
        }
    }

    /// Removes every effect from `entity`.
    pub fn clear(&self, entity: EntityId) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .stacks
            .remove(&entity);
    }

    /// Declares the members of a group, replacing any previous definition.
    pub fn define_group<I, S>(&self, group: impl Into<String>, effects: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members = effects.into_iter().map(StatusEffectId::new).collect();
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .groups
            .insert(StatusGroupId::new(group), members);
    }

    /// Current stacks of `effect` on `entity`.
    #[must_use]
    pub fn stacks(&self, entity: EntityId, effect: &StatusEffectId) -> u32 {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .stacks
            .get(&entity)
            .and_then(|held| held.get(effect))
            .copied()
            .unwrap_or(0)
    }
}

impl StatusEffects for StatusTable {
    fn has_effect(&self, entity: EntityId, effect: &StatusEffectId, min_stacks: u32) -> bool {
        let stacks = self.stacks(entity, effect);
        stacks > 0 && stacks >= min_stacks
    }

    fn has_group(&self, entity: EntityId, group: &StatusGroupId) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let (Some(members), Some(held)) = (inner.groups.get(group), inner.stacks.get(&entity))
        else {
            return false;
        };
        held.keys().any(|effect| members.contains(effect))
    }
}

// =============================================================================
// Line of Sight
// =============================================================================

/// Visibility query.
pub trait LineOfSight: Send + Sync {
    /// Returns true if nothing blocks the segment from `from` to `to`.
    fn is_visible(&self, from: Vec3, to: Vec3) -> bool;
}

/// No occluders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenField;

impl LineOfSight for OpenField {
    fn is_visible(&self, _from: Vec3, _to: Vec3) -> bool {
        true
    }
}

// =============================================================================
// Presentation
// =============================================================================

/// Receives skill events after they resolve, for animation, audio and VFX.
pub trait Presentation: Send + Sync {
    /// Called once per event, in resolution order.
    fn notify(&self, event: &Event);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Silent;

impl Presentation for Silent {
    fn notify(&self, _event: &Event) {}
}

// =============================================================================
// Bundle
// =============================================================================

/// Every collaborator a simulation uses.
#[derive(Clone)]
pub struct Collaborators {
    /// Derived numbers.
    pub formulas: Arc<dyn Formulas>,
    /// Ground query.
    pub ground: Arc<dyn GroundProbe>,
    /// Status-effect lookup.
    pub status: Arc<dyn StatusEffects>,
    /// Visibility query.
    pub line_of_sight: Arc<dyn LineOfSight>,
    /// Event sink.
    pub presentation: Arc<dyn Presentation>,
}

impl Collaborators {
    /// Built-in collaborators on flat ground at height 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formulas: Arc::new(StatFormulas),
            ground: Arc::new(FlatGround::new(0.0)),
            status: Arc::new(StatusTable::new()),
            line_of_sight: Arc::new(OpenField),
            presentation: Arc::new(Silent),
        }
    }

    /// Replaces the formulas (builder style).
    #[must_use]
    pub fn with_formulas(mut self, formulas: Arc<dyn Formulas>) -> Self {
        self.formulas = formulas;
        self
    }

    /// Replaces the ground probe (builder style).
    #[must_use]
    pub fn with_ground(mut self, ground: Arc<dyn GroundProbe>) -> Self {
        self.ground = ground;
        self
    }

    /// Replaces the status lookup (builder style).
    #[must_use]
    pub fn with_status(mut self, status: Arc<dyn StatusEffects>) -> Self {
        self.status = status;
        self
    }

    /// Replaces the visibility query (builder style).
    #[must_use]
    pub fn with_line_of_sight(mut self, line_of_sight: Arc<dyn LineOfSight>) -> Self {
        self.line_of_sight = line_of_sight;
        self
    }

    /// Replaces the event sink (builder style).
    #[must_use]
    pub fn with_presentation(mut self, presentation: Arc<dyn Presentation>) -> Self {
        self.presentation = presentation;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
