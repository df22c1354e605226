//! The simulation tick loop.
//!
//! `Simulation` owns the arena, one [`SkillExecutor`] per entity, the skill
//! catalog and the resolvers. Each [`step`](Simulation::step) runs:
//!
//! 1. **SNAPSHOT**: the current arena is read-only for the rest of the step
//! 2. **SKILLS**: every executor advances in parallel against a
//!    [`WorldView`] of the snapshot and emits outputs
//! 3. **RESOLUTION**: `next` is cloned from `current`; physics, combat and
//!    event resolvers apply the outputs to it
//! 4. **APPLY**: the arenas swap and the tick advances
//!
//! Host calls between steps (cast requests, cancellations, direct motion)
//! act on the current arena. Outputs they produce are queued and resolved
//! at the start of the next step's resolution, ahead of executor outputs.
//!
//! # Determinism
//!
//! - Executor outputs are sorted by (entity, sequence) before resolution
//! - Entities and executors are iterated in ID order
//! - Trace IDs come from a counter in the arena
//!
//! # Example
//!
//! ```
//! use riftcast_core::config::SimulationConfig;
//! use riftcast_core::entity::{EntityInit, EntityTag};
//! use riftcast_core::executor::SkillPhase;
//! use riftcast_core::simulation::Simulation;
//! use riftcast_core::skill::{Action, ActionTimeline, SkillCatalog, SkillDefinition, SkillId};
//!
//! let wave = SkillDefinition::new("wave").with_timeline(
//!     ActionTimeline::new().then(0.05, Action::Cue { name: "wave".into() }),
//! );
//! let catalog = SkillCatalog::from_definitions([wave]).unwrap();
//! let mut sim = Simulation::new(SimulationConfig::default(), catalog).unwrap();
//!
//! let hero = sim.spawn(EntityTag::Character, EntityInit::default());
//! sim.request_cast(hero, &SkillId::new("wave"), None).unwrap();
//! assert_eq!(sim.phase(hero), Some(SkillPhase::Casting));
//!
//! for _ in 0..5 {
//!     sim.step();
//! }
//! assert_eq!(sim.phase(hero), Some(SkillPhase::Idle));
//! assert!(!sim.take_events().is_empty());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use rayon::prelude::*;
use riftcast_motion::MoveRequest;
use tracing::debug;

use crate::arena::Arena;
use crate::collab::Collaborators;
use crate::config::SimulationConfig;
use crate::entity::{Entity, EntityId, EntityInit, EntityTag};
use crate::error::{CastRefusal, CastResult, ConfigResult, HostError, HostResult};
use crate::executor::{CastTicket, ExecContext, SkillExecutor, SkillPhase};
use crate::output::{CancelReason, OutputBuffer, OutputEnvelope};
use crate::resolver::{CombatResolver, EventResolver, PhysicsResolver, Resolver};
use crate::skill::{SkillCatalog, SkillId};
use crate::world_view::WorldView;

// =============================================================================
// Simulation
// =============================================================================

/// Combat simulation with skill execution and motion.
///
/// # Double Buffering
///
/// Executors read `current`; resolvers write `next`. The two swap at the end
/// of every step.
pub struct Simulation {
    current: Arena,
    next: Arena,
    executors: BTreeMap<EntityId, SkillExecutor>,
    catalog: SkillCatalog,
    config: SimulationConfig,
    collab: Collaborators,
    pending: Vec<OutputEnvelope>,
    physics: PhysicsResolver,
    combat: CombatResolver,
    events: EventResolver,
    custom: Vec<Box<dyn Resolver>>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.current.current_tick())
            .field("entities", &self.current.entity_count())
            .field("skills", &self.catalog.len())
            .field("config", &self.config)
            .field("pending", &self.pending.len())
            .field("resolvers", &format!("[{} resolvers]", self.resolver_count()))
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates an empty simulation at tick 0 with the built-in
    /// collaborators.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSimulation`](crate::error::ConfigError::InvalidSimulation)
    /// if `config` fails validation.
    pub fn new(config: SimulationConfig, catalog: SkillCatalog) -> ConfigResult<Self> {
        config.validate()?;
        let collab = Collaborators::default();
        Ok(Self {
            current: Arena::new(),
            next: Arena::new(),
            executors: BTreeMap::new(),
            catalog,
            physics: PhysicsResolver::new(&config, &collab),
            combat: CombatResolver::new(),
            events: EventResolver::with_presentation(Arc::clone(&collab.presentation)),
            custom: Vec::new(),
            config,
            collab,
            pending: Vec::new(),
        })
    }

    /// Replaces the collaborators (builder style).
    ///
    /// Rebuilds the physics and event resolvers around them. Undrained
    /// events are discarded.
    #[must_use]
    pub fn with_collaborators(mut self, collab: Collaborators) -> Self {
        self.physics = PhysicsResolver::new(&self.config, &collab);
        self.events = EventResolver::with_presentation(Arc::clone(&collab.presentation));
        self.collab = collab;
        self
    }

    /// Appends a resolver that runs after the built-in ones.
    pub fn add_resolver(&mut self, resolver: Box<dyn Resolver>) {
        self.custom.push(resolver);
    }

    /// Number of resolvers run each step.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        3 + self.custom.len()
    }

    // =========================================================================
    // Tick Loop
    // =========================================================================

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        let tick = self.current.current_tick();

        // SKILLS
        let executed = self.run_executors(tick);
        let mut outputs = std::mem::take(&mut self.pending);
        outputs.extend(executed);

        // RESOLUTION
        self.next.clone_from(&self.current);
        resolve_with(&self.physics, &outputs, &self.current, &mut self.next);
        resolve_with(&self.combat, &outputs, &self.current, &mut self.next);
        resolve_with(&self.events, &outputs, &self.current, &mut self.next);
        for resolver in &self.custom {
            resolve_with(resolver.as_ref(), &outputs, &self.current, &mut self.next);
        }

        // APPLY
        std::mem::swap(&mut self.current, &mut self.next);
        self.current.advance_tick();
    }

    /// Advances every executor in parallel. Returns outputs sorted by
    /// (entity, sequence).
    fn run_executors(&mut self, tick: u64) -> Vec<OutputEnvelope> {
        let ctx = ExecContext {
            view: WorldView::new(&self.current, tick),
            collab: &self.collab,
            policy: self.config.interrupt_policy,
            dt: self.config.dt,
        };

        let mut outputs: Vec<OutputEnvelope> = self
            .executors
            .par_iter_mut()
            .flat_map_iter(|(_, executor)| executor.tick(&ctx))
            .collect();

        outputs.sort_by_key(|o| (o.source(), o.sequence()));
        outputs
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Spawns an entity with an idle executor.
    ///
    /// Grounding is evaluated at the spawn position, so an entity placed on
    /// the ground can use grounded skills before the first step.
    pub fn spawn(&mut self, tag: EntityTag, init: EntityInit) -> EntityId {
        let id = self.current.spawn(tag, init, self.config.gravity);
        if let Some(entity) = self.current.get_mut(id) {
            let transform = entity.transform;
            entity
                .motion
                .settle(&transform, self.collab.ground.as_ref(), &self.config.ground_probe);
        }
        self.executors.insert(id, SkillExecutor::new(id));
        debug!(entity = %id, %tag, "spawned");
        id
    }

    /// Removes an entity and its executor.
    ///
    /// An active cast is reported as interrupted by death.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        if let Some(mut executor) = self.executors.remove(&id) {
            let mut out = OutputBuffer::new(id, self.current.current_tick());
            executor.cancel(CancelReason::CasterDied, &mut out);
            self.pending.extend(out.into_envelopes());
        }
        self.current.despawn(id)
    }

    // =========================================================================
    // Casting
    // =========================================================================

    /// Requests a cast of `skill` by `caster`.
    ///
    /// `selected` overrides the caster's selected target for this request.
    /// On success the cast starts immediately; outputs of its first actions
    /// resolve in the next step.
    ///
    /// # Errors
    ///
    /// The first failed check as a [`CastRefusal`]. A refused request
    /// changes nothing.
    pub fn request_cast(
        &mut self,
        caster: EntityId,
        skill: &SkillId,
        selected: Option<EntityId>,
    ) -> CastResult<CastTicket> {
        let tick = self.current.current_tick();
        if !self.current.contains(caster) {
            return Err(CastRefusal::UnknownCaster(caster));
        }
        let executor = self
            .executors
            .get_mut(&caster)
            .ok_or(CastRefusal::UnknownCaster(caster))?;
        let definition = self
            .catalog
            .get(skill)
            .ok_or_else(|| CastRefusal::UnknownSkill(skill.clone()))?;

        let ctx = ExecContext {
            view: WorldView::new(&self.current, tick),
            collab: &self.collab,
            policy: self.config.interrupt_policy,
            dt: self.config.dt,
        };
        let target = executor
            .validate_request(&definition, selected, &ctx)
            .inspect_err(|refusal| {
                debug!(%caster, %skill, %refusal, "cast refused");
            })?;

        let trace_id = self.current.new_trace_id();
        let ctx = ExecContext {
            view: WorldView::new(&self.current, tick),
            collab: &self.collab,
            policy: self.config.interrupt_policy,
            dt: self.config.dt,
        };
        let mut out = OutputBuffer::new(caster, tick);
        let ticket = executor.begin(definition, target, trace_id, &ctx, &mut out);
        self.pending.extend(out.into_envelopes());
        Ok(ticket)
    }

    /// Cancels the caster's active cast. Returns whether one was running.
    pub fn cancel_cast(&mut self, caster: EntityId) -> bool {
        let Some(executor) = self.executors.get_mut(&caster) else {
            return false;
        };
        let mut out = OutputBuffer::new(caster, self.current.current_tick());
        let cancelled = executor.cancel(CancelReason::Manual, &mut out);
        self.pending.extend(out.into_envelopes());
        cancelled
    }

    /// Releases a held charge. Returns false unless the caster is charging.
    pub fn release_charge(&mut self, caster: EntityId) -> bool {
        self.executors
            .get_mut(&caster)
            .is_some_and(SkillExecutor::release)
    }

    /// Sets the caster's external target.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownEntity`] if `caster` does not exist.
    pub fn select_target(&mut self, caster: EntityId, target: Option<EntityId>) -> HostResult<()> {
        let executor = self
            .executors
            .get_mut(&caster)
            .ok_or(HostError::UnknownEntity(caster))?;
        executor.select_target(target);
        Ok(())
    }

    /// Returns the caster's executor.
    #[must_use]
    pub fn executor(&self, caster: EntityId) -> Option<&SkillExecutor> {
        self.executors.get(&caster)
    }

    /// Phase of the caster's executor.
    #[must_use]
    pub fn phase(&self, caster: EntityId) -> Option<SkillPhase> {
        self.executor(caster).map(SkillExecutor::phase)
    }

    /// The caster's active skill.
    #[must_use]
    pub fn active_skill(&self, caster: EntityId) -> Option<&SkillId> {
        self.executor(caster)?.active_skill()
    }

    /// Seconds until `skill` is ready for `caster`.
    #[must_use]
    pub fn cooldown_remaining(&self, caster: EntityId, skill: &SkillId) -> f32 {
        self.executor(caster)
            .map_or(0.0, |executor| executor.cooldown_remaining(skill))
    }

    /// Charge progress in `[0, 1]` while charging.
    #[must_use]
    pub fn charge_fraction(&self, caster: EntityId) -> Option<f32> {
        let entity = self.current.get(caster)?;
        self.executor(caster)?.charge_fraction(entity, &self.collab)
    }

    // =========================================================================
    // Motion
    // =========================================================================

    fn entity_mut(&mut self, id: EntityId) -> HostResult<&mut Entity> {
        self.current.get_mut(id).ok_or(HostError::UnknownEntity(id))
    }

    /// Moves an entity by one tick of input at its movement speed.
    ///
    /// Input is mapped through the entity's steering strategy. Returns the
    /// displacement applied.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownEntity`] if `id` does not exist.
    pub fn move_entity(
        &mut self,
        id: EntityId,
        input: Vec3,
        multiplier: f32,
        rotate_to_face: bool,
    ) -> HostResult<Vec3> {
        let (dt, tick) = (self.config.dt, self.current.current_tick());
        let formulas = Arc::clone(&self.collab.formulas);
        let entity = self.entity_mut(id)?;

        let request = MoveRequest::world(input, formulas.movement_speed(entity))
            .with_steering(entity.steering)
            .with_multiplier(multiplier)
            .facing(rotate_to_face);
        let mut transform = entity.transform;
        let displacement = entity.motion.move_by(&mut transform, &request, dt, tick);
        entity.transform = transform;
        Ok(displacement)
    }

    /// Jumps to the entity's jump height. Returns false if not grounded or
    /// jumping is locked.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownEntity`] if `id` does not exist.
    pub fn jump(&mut self, id: EntityId) -> HostResult<bool> {
        let tick = self.current.current_tick();
        let formulas = Arc::clone(&self.collab.formulas);
        let entity = self.entity_mut(id)?;
        let height = formulas.jump_height(entity);
        Ok(entity.motion.jump(height, tick))
    }

    /// Adds an impulse to the entity's velocity.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownEntity`] if `id` does not exist.
    pub fn apply_force(&mut self, id: EntityId, force: Vec3) -> HostResult<()> {
        self.entity_mut(id)?.motion.apply_force(force);
        Ok(())
    }

    /// Launches the entity on an arc landing on `target`. Returns the launch
    /// velocity.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownEntity`] if `id` does not exist, or
    /// [`HostError::Motion`] if no arc at `angle_degrees` reaches `target`.
    pub fn launch(&mut self, id: EntityId, target: Vec3, angle_degrees: f32) -> HostResult<Vec3> {
        let entity = self.entity_mut(id)?;
        let mut transform = entity.transform;
        let velocity = entity.motion.launch(&mut transform, target, angle_degrees)?;
        entity.transform = transform;
        Ok(velocity)
    }

    /// Turns the entity toward `target` by one tick at its rotate speed.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownEntity`] if `id` does not exist.
    pub fn rotate_toward_position(&mut self, id: EntityId, target: Vec3) -> HostResult<bool> {
        let dt = self.config.dt;
        let formulas = Arc::clone(&self.collab.formulas);
        let entity = self.entity_mut(id)?;
        let speed = formulas.rotate_speed(entity);
        let mut transform = entity.transform;
        let turned = entity
            .motion
            .rotate_toward_position(&mut transform, target, speed, dt);
        entity.transform = transform;
        Ok(turned)
    }

    /// Starts turning toward `target` over the following steps.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownEntity`] if `id` does not exist.
    pub fn start_rotate_toward(&mut self, id: EntityId, target: Vec3, multiplier: f32) -> HostResult<()> {
        let tick = self.current.current_tick();
        self.entity_mut(id)?
            .motion
            .start_rotate_toward(target, multiplier, tick);
        Ok(())
    }

    /// Stops an in-flight rotate-toward. Returns whether one was running.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownEntity`] if `id` does not exist.
    pub fn cancel_rotate_toward(&mut self, id: EntityId) -> HostResult<bool> {
        Ok(self.entity_mut(id)?.motion.cancel_rotate_toward())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Drains recorded events, oldest first.
    pub fn take_events(&self) -> Vec<OutputEnvelope> {
        self.events.take_events()
    }

    /// The current arena.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.current
    }

    /// Mutable access to the current arena for setup between steps.
    #[must_use]
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.current
    }

    /// The current tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.current.current_tick()
    }

    /// The skill catalog.
    #[must_use]
    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    /// The simulation config.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The collaborators.
    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.collab
    }
}

/// Routes the outputs `resolver` handles to it.
fn resolve_with(resolver: &dyn Resolver, outputs: &[OutputEnvelope], current: &Arena, next: &mut Arena) {
    let relevant: Vec<&OutputEnvelope> = outputs
        .iter()
        .filter(|o| resolver.handles().contains(&o.output().kind()))
        .collect();
    resolver.resolve(&relevant, current, next);
}

// =============================================================================
// Tests
// =============================================================================
