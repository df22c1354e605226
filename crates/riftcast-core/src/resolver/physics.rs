//! Physics resolver: skill-driven motion and per-tick integration.
//!
//! Handles:
//! - `ApplyForce` commands: add an impulse to the target's velocity
//! - `Launch` commands: put the target on a ballistic arc
//! - Integration: gravity, grounding and `position += velocity * dt` for
//!   every entity
//! - Rotate-toward sequences started by the host
//!
//! Commands apply before integration, so a force emitted this tick already
//! moves the entity this tick.

use std::fmt;
use std::sync::Arc;

use riftcast_motion::{GroundProbe, GroundProbeConfig, RotationProgress};
use tracing::{debug, warn};

use crate::arena::Arena;
use crate::collab::{Collaborators, Formulas};
use crate::config::SimulationConfig;
use crate::entity::EntityId;
use crate::output::{Command, OutputEnvelope, OutputKind};

use super::Resolver;

/// Resolver for motion commands and integration.
///
/// # Processing Order
///
/// 1. Apply commands in output order
/// 2. Integrate every entity in ID order
/// 3. Advance in-flight rotate-toward sequences
/// 4. Re-index every position
///
/// # Example
///
/// ```
/// use riftcast_core::collab::Collaborators;
/// use riftcast_core::config::SimulationConfig;
/// use riftcast_core::output::OutputKind;
/// use riftcast_core::resolver::{PhysicsResolver, Resolver};
///
/// let resolver = PhysicsResolver::new(&SimulationConfig::default(), &Collaborators::default());
/// assert!(resolver.handles().contains(&OutputKind::Command));
/// ```
#[derive(Clone)]
pub struct PhysicsResolver {
    dt: f32,
    probe: GroundProbeConfig,
    ground: Arc<dyn GroundProbe>,
    formulas: Arc<dyn Formulas>,
}

impl PhysicsResolver {
    /// Creates a physics resolver using the step length and probe shape of
    /// `config`, and the ground and formulas of `collab`.
    #[must_use]
    pub fn new(config: &SimulationConfig, collab: &Collaborators) -> Self {
        Self {
            dt: config.dt,
            probe: config.ground_probe,
            ground: Arc::clone(&collab.ground),
            formulas: Arc::clone(&collab.formulas),
        }
    }

    /// Overrides the timestep (builder style).
    #[must_use]
    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    /// Returns the integration timestep.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    fn apply_force(next: &mut Arena, target: EntityId, force: glam::Vec3) {
        if let Some(entity) = next.get_mut(target) {
            entity.motion.apply_force(force);
        }
    }

    fn launch(next: &mut Arena, target: EntityId, destination: glam::Vec3, angle_degrees: f32) {
        let Some(entity) = next.get_mut(target) else {
            return;
        };
        let mut transform = entity.transform;
        match entity.motion.launch(&mut transform, destination, angle_degrees) {
            Ok(velocity) => {
                entity.transform = transform;
                debug!(entity = %target, %velocity, "launched");
            }
            Err(error) => {
                warn!(entity = %target, %destination, angle_degrees, %error, "launch rejected");
            }
        }
    }

    fn integrate(&self, next: &mut Arena) {
        let dt = self.dt;
        for entity in next.entities_sorted_mut() {
            let mut transform = entity.transform;
            entity
                .motion
                .integrate(&mut transform, self.ground.as_ref(), &self.probe, dt);

            if entity.motion.rotation_task().is_some() {
                let speed = self.formulas.rotate_speed(entity);
                if entity.motion.advance_rotation(&mut transform, speed, dt)
                    == RotationProgress::Finished
                {
                    debug!(entity = %entity.id(), "rotate-toward finished");
                }
            }
            entity.transform = transform;
        }
    }
}

impl Default for PhysicsResolver {
    fn default() -> Self {
        Self::new(&SimulationConfig::default(), &Collaborators::default())
    }
}

impl fmt::Debug for PhysicsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsResolver")
            .field("dt", &self.dt)
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

impl Resolver for PhysicsResolver {
    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Command]
    }

    fn resolve(&self, outputs: &[&OutputEnvelope], _current: &Arena, next: &mut Arena) {
        for envelope in outputs {
            match envelope.output().as_command() {
                Some(Command::ApplyForce { target, force }) => {
                    Self::apply_force(next, *target, *force);
                }
                Some(Command::Launch {
                    target,
                    destination,
                    angle_degrees,
                }) => Self::launch(next, *target, *destination, *angle_degrees),
                None => {}
            }
        }

        self.integrate(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityInit, EntityTag};
    use crate::output::{Output, TraceId};
    use glam::Vec3;
    use riftcast_motion::{FlatGround, NoGround};

    const DT: f32 = 0.1;

    fn envelope(command: Command) -> OutputEnvelope {
        OutputEnvelope::new(Output::Command(command), EntityId::new(0), TraceId::new(0), 0, 0)
    }

    fn airborne_resolver() -> PhysicsResolver {
        let collab = Collaborators::default().with_ground(Arc::new(NoGround));
        PhysicsResolver::new(&SimulationConfig::default(), &collab).with_dt(DT)
    }

    fn arena_with(position: Vec3) -> (Arena, EntityId) {
        let mut arena = Arena::new();
        let id = arena.spawn(EntityTag::Character, EntityInit::at_position(position), -10.0);
        (arena, id)
    }

    #[test]
    fn handles_commands_only() {
        let resolver = PhysicsResolver::default();
        assert_eq!(resolver.handles(), &[OutputKind::Command]);
        assert!((resolver.dt() - crate::config::FIXED_DT).abs() < f32::EPSILON);
    }

    #[test]
    fn force_moves_entity_same_tick() {
        let resolver = airborne_resolver();
        let (current, id) = arena_with(Vec3::new(0.0, 5.0, 0.0));
        let mut next = current.clone();
        let out = envelope(Command::ApplyForce { target: id, force: Vec3::X * 10.0 });

        resolver.resolve(&[&out], &current, &mut next);

        let entity = next.get(id).unwrap();
        assert!((entity.position().x - 1.0).abs() < 1e-5);
        assert!(entity.motion.velocity().y < 0.0);
    }

    #[test]
    fn gravity_stops_at_flat_ground() {
        let collab = Collaborators::default().with_ground(Arc::new(FlatGround::new(0.0)));
        let resolver = PhysicsResolver::new(&SimulationConfig::default(), &collab).with_dt(DT);
        let (current, id) = arena_with(Vec3::new(0.0, 0.05, 0.0));
        let mut next = current.clone();

        resolver.resolve(&[], &current, &mut next);

        assert!(next.get(id).unwrap().motion.is_grounded());
    }

    #[test]
    fn launch_sets_velocity_toward_destination() {
        let resolver = airborne_resolver();
        let (current, id) = arena_with(Vec3::ZERO);
        let mut next = current.clone();
        let out = envelope(Command::Launch {
            target: id,
            destination: Vec3::new(10.0, 0.0, 0.0),
            angle_degrees: 45.0,
        });

        resolver.resolve(&[&out], &current, &mut next);

        let entity = next.get(id).unwrap();
        assert!(entity.motion.velocity().x > 0.0);
        assert!(entity.motion.velocity().y > 0.0);
        assert!((entity.forward() - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn impossible_launch_leaves_velocity() {
        let resolver = airborne_resolver();
        let (current, id) = arena_with(Vec3::ZERO);
        let mut next = current.clone();
        let out = envelope(Command::Launch {
            target: id,
            destination: Vec3::new(1.0, 50.0, 0.0),
            angle_degrees: 10.0,
        });

        resolver.resolve(&[&out], &current, &mut next);

        assert_eq!(next.get(id).unwrap().motion.velocity().x, 0.0);
    }

    #[test]
    fn missing_target_ignored() {
        let resolver = airborne_resolver();
        let (current, _) = arena_with(Vec3::ZERO);
        let mut next = current.clone();
        let out = envelope(Command::ApplyForce { target: EntityId::new(42), force: Vec3::Y });
        resolver.resolve(&[&out], &current, &mut next);
        assert_eq!(next.entity_count(), 1);
    }

    #[test]
    fn rotate_toward_advances() {
        let resolver = airborne_resolver();
        let (current, id) = arena_with(Vec3::ZERO);
        let mut next = current.clone();
        if let Some(entity) = next.get_mut(id) {
            entity.motion.start_rotate_toward(Vec3::new(10.0, 0.0, 0.0), 1.0, 0);
        }
        for _ in 0..20 {
            let snapshot = next.clone();
            resolver.resolve(&[], &snapshot, &mut next);
        }
        let entity = next.get(id).unwrap();
        assert!(entity.motion.rotation_task().is_none());
        assert!((entity.forward() - Vec3::X).length() < 0.1);
    }
}
