//! Arena: the container for every entity in a simulation.
//!
//! - Entity storage with deterministic iteration order (`BTreeMap`)
//! - Entity lifecycle (spawn/despawn)
//! - Trace ID generation, one per cast
//!
//! # Example
//!
//! ```
//! use riftcast_core::arena::Arena;
//! use riftcast_core::entity::{EntityInit, EntityTag};
//! use glam::Vec3;
//!
//! let mut arena = Arena::new();
//! let hero = arena.spawn(EntityTag::Character, EntityInit::at_position(Vec3::new(1.0, 0.0, 2.0)), -9.81);
//!
//! assert_eq!(arena.get(hero).map(|e| e.position()), Some(Vec3::new(1.0, 0.0, 2.0)));
//! assert_eq!(arena.entity_count(), 1);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, EntityInit, EntityTag};
use crate::output::TraceId;

// =============================================================================
// Arena
// =============================================================================

/// All entities of a simulation plus its tick and ID counters.
///
/// # Determinism
///
/// Entity IDs are assigned monotonically and stored in a `BTreeMap`, so
/// iteration always visits entities in spawn order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    next_id: u64,
    entities: BTreeMap<EntityId, Entity>,
    tick: u64,
    next_trace_id: u64,
}

impl Arena {
    /// Creates an empty arena at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entities: BTreeMap::new(),
            tick: 0,
            next_trace_id: 0,
        }
    }

    /// Spawns an entity.
    ///
    /// # Arguments
    ///
    /// * `tag` - The entity kind
    /// * `init` - Spawn parameters
    /// * `gravity` - Gravity used unless `init` overrides it
    pub fn spawn(&mut self, tag: EntityTag, init: EntityInit, gravity: f32) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;

        let entity = Entity::new(id, tag, init, gravity);
        self.entities.insert(id, entity);
        id
    }

    /// Removes an entity.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Returns a reference to an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Returns a mutable reference to an entity by ID.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Returns true if `id` is present.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Entity IDs in ascending order.
    pub fn entity_ids_sorted(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Entities in ascending ID order.
    pub fn entities_sorted(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Mutable entities in ascending ID order.
    pub fn entities_sorted_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.values_mut()
    }

    /// Allocates the next trace ID.
    pub fn new_trace_id(&mut self) -> TraceId {
        let id = TraceId::new(self.next_trace_id);
        self.next_trace_id += 1;
        id
    }

    /// Returns the number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the arena has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Advances the tick counter.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const G: f32 = -9.81;

    mod arena_tests {
        use super::*;

        #[test]
        fn spawn_assigns_sequential_ids() {
            let mut arena = Arena::new();
            let a = arena.spawn(EntityTag::Character, EntityInit::default(), G);
            let b = arena.spawn(EntityTag::Projectile, EntityInit::default(), G);
            assert_eq!(a.as_u64(), 0);
            assert_eq!(b.as_u64(), 1);
            assert_eq!(arena.entity_count(), 2);
            assert!(arena.get(b).is_some_and(Entity::is_projectile));
        }

        #[test]
        fn despawn_removes_entity() {
            let mut arena = Arena::new();
            let a = arena.spawn(EntityTag::Character, EntityInit::default(), G);
            assert!(arena.despawn(a).is_some());
            assert!(arena.get(a).is_none());
            assert!(arena.is_empty());
            assert!(arena.despawn(a).is_none());
        }

        #[test]
        fn ids_not_reused_after_despawn() {
            let mut arena = Arena::new();
            let a = arena.spawn(EntityTag::Character, EntityInit::default(), G);
            arena.despawn(a);
            let b = arena.spawn(EntityTag::Character, EntityInit::default(), G);
            assert_ne!(a, b);
        }

        #[test]
        fn iteration_is_sorted() {
            let mut arena = Arena::new();
            let ids: Vec<_> = (0..5)
                .map(|_| arena.spawn(EntityTag::Character, EntityInit::default(), G))
                .collect();
            assert_eq!(arena.entity_ids_sorted().collect::<Vec<_>>(), ids);
            assert_eq!(
                arena.entities_sorted().map(Entity::id).collect::<Vec<_>>(),
                ids
            );
        }

        #[test]
        fn trace_ids_are_monotonic() {
            let mut arena = Arena::new();
            let first = arena.new_trace_id();
            let second = arena.new_trace_id();
            assert!(second.as_u64() > first.as_u64());
        }

        #[test]
        fn tick_advances() {
            let mut arena = Arena::new();
            assert_eq!(arena.current_tick(), 0);
            arena.advance_tick();
            arena.advance_tick();
            assert_eq!(arena.current_tick(), 2);
        }
    }
}
