//! Combat resolver: health and resource changes.
//!
//! Handles:
//! - `ApplyDamage`: reduce health, clamped at zero
//! - `ApplyHealing`: restore health up to the maximum; the dead stay dead
//! - `CollectCost`: deduct from a resource pool, saturating at zero
//!
//! Modifiers apply in output order. An entity reaching zero health is dead
//! from the next tick on; its executor cancels the active cast then.

use tracing::{debug, info};

use crate::arena::Arena;
use crate::entity::{EntityId, ResourceKind};
use crate::output::{Modifier, OutputEnvelope, OutputKind};

use super::Resolver;

/// Resolver for combat modifiers.
///
/// # Example
///
/// ```
/// use riftcast_core::output::OutputKind;
/// use riftcast_core::resolver::{CombatResolver, Resolver};
///
/// let resolver = CombatResolver::new();
/// assert!(resolver.handles().contains(&OutputKind::Modifier));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CombatResolver;

impl CombatResolver {
    /// Creates a combat resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn apply_damage(next: &mut Arena, source: EntityId, target: EntityId, amount: f32) {
        let Some(entity) = next.get_mut(target) else {
            return;
        };
        let was_alive = entity.combat.is_alive();
        entity.combat.damage(amount);
        if was_alive && !entity.combat.is_alive() {
            info!(entity = %target, killer = %source, "entity died");
        }
    }

    fn apply_healing(next: &mut Arena, target: EntityId, amount: f32) {
        if let Some(entity) = next.get_mut(target) {
            entity.combat.heal(amount);
        }
    }

    fn collect_cost(next: &mut Arena, target: EntityId, resource: ResourceKind, amount: f32) {
        if let Some(entity) = next.get_mut(target) {
            let paid = entity.combat.spend(resource, amount);
            if paid < amount {
                debug!(entity = %target, %resource, amount, paid, "cost partially paid");
            }
        }
    }
}

impl Resolver for CombatResolver {
    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Modifier]
    }

    fn resolve(&self, outputs: &[&OutputEnvelope], _current: &Arena, next: &mut Arena) {
        for envelope in outputs {
            match envelope.output().as_modifier() {
                Some(Modifier::ApplyDamage {
                    source,
                    target,
                    amount,
                }) => Self::apply_damage(next, *source, *target, *amount),
                Some(Modifier::ApplyHealing { target, amount, .. }) => {
                    Self::apply_healing(next, *target, *amount);
                }
                Some(Modifier::CollectCost {
                    target,
                    resource,
                    amount,
                }) => Self::collect_cost(next, *target, *resource, *amount),
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CombatState, EntityInit, EntityTag, TeamId};
    use crate::output::{Output, TraceId};

    fn envelope(modifier: Modifier) -> OutputEnvelope {
        OutputEnvelope::new(Output::Modifier(modifier), EntityId::new(0), TraceId::new(0), 0, 0)
    }

    fn arena() -> (Arena, EntityId) {
        let mut arena = Arena::new();
        let combat = CombatState::new(100.0, TeamId::new(1)).with_pool(ResourceKind::Mana, 30.0);
        let id = arena.spawn(EntityTag::Character, EntityInit::default().with_combat(combat), -9.81);
        (arena, id)
    }

    fn resolve(outputs: &[OutputEnvelope]) -> (Arena, EntityId) {
        let (current, id) = arena();
        let mut next = current.clone();
        let refs: Vec<&OutputEnvelope> = outputs.iter().collect();
        CombatResolver::new().resolve(&refs, &current, &mut next);
        (next, id)
    }

    #[test]
    fn handles_modifiers_only() {
        assert_eq!(CombatResolver::new().handles(), &[OutputKind::Modifier]);
    }

    #[test]
    fn damage_and_healing_apply_in_order() {
        let id = EntityId::new(0);
        let (next, _) = resolve(&[
            envelope(Modifier::ApplyDamage { source: id, target: id, amount: 60.0 }),
            envelope(Modifier::ApplyHealing { source: id, target: id, amount: 25.0 }),
        ]);
        assert!((next.get(id).unwrap().combat.health - 65.0).abs() < 1e-5);
    }

    #[test]
    fn damage_clamps_and_healing_does_not_revive() {
        let id = EntityId::new(0);
        let (next, _) = resolve(&[
            envelope(Modifier::ApplyDamage { source: id, target: id, amount: 500.0 }),
            envelope(Modifier::ApplyHealing { source: id, target: id, amount: 50.0 }),
        ]);
        let combat = &next.get(id).unwrap().combat;
        assert_eq!(combat.health, 0.0);
        assert!(!combat.is_alive());
    }

    #[test]
    fn healing_caps_at_max() {
        let id = EntityId::new(0);
        let (next, _) = resolve(&[
            envelope(Modifier::ApplyDamage { source: id, target: id, amount: 10.0 }),
            envelope(Modifier::ApplyHealing { source: id, target: id, amount: 40.0 }),
        ]);
        assert!((next.get(id).unwrap().combat.health - 100.0).abs() < 1e-5);
    }

    #[test]
    fn costs_saturate_at_zero() {
        let id = EntityId::new(0);
        let (next, _) = resolve(&[
            envelope(Modifier::CollectCost { target: id, resource: ResourceKind::Mana, amount: 20.0 }),
            envelope(Modifier::CollectCost { target: id, resource: ResourceKind::Mana, amount: 20.0 }),
        ]);
        assert_eq!(next.get(id).unwrap().combat.available(ResourceKind::Mana), 0.0);
    }

    #[test]
    fn unknown_target_ignored() {
        let (next, id) = resolve(&[envelope(Modifier::ApplyDamage {
            source: EntityId::new(0),
            target: EntityId::new(9),
            amount: 10.0,
        })]);
        assert!((next.get(id).unwrap().combat.health - 100.0).abs() < 1e-5);
    }
}
