//! Read-only view of the arena for skill executors.
//!
//! Executors run in parallel during the skill phase and must not mutate the
//! arena; every change they want is emitted as an
//! [`Output`](crate::output::Output). `WorldView` is the only arena access
//! they get.

use glam::Vec3;

use crate::arena::Arena;
use crate::entity::{Entity, EntityId};

/// Immutable snapshot access for one tick.
///
/// # Example
///
/// ```
/// use riftcast_core::arena::Arena;
/// use riftcast_core::entity::{EntityInit, EntityTag};
/// use riftcast_core::world_view::WorldView;
/// use glam::Vec3;
///
/// let mut arena = Arena::new();
/// let id = arena.spawn(EntityTag::Character, EntityInit::at_position(Vec3::X), -9.81);
///
/// let view = WorldView::new(&arena, arena.current_tick());
/// assert_eq!(view.position(id), Some(Vec3::X));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    arena: &'a Arena,
    tick: u64,
}

impl<'a> WorldView<'a> {
    /// Creates a view of `arena` at `tick`.
    #[must_use]
    pub const fn new(arena: &'a Arena, tick: u64) -> Self {
        Self { arena, tick }
    }

    /// Returns the tick this view was taken at.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Returns an entity by ID.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&'a Entity> {
        self.arena.get(id)
    }

    /// Returns an entity's position.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.arena.get(id).map(Entity::position)
    }
}
