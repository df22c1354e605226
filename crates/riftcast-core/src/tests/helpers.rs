//! Scenario setup shared by the crate-level tests.

use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec3;

use crate::collab::Presentation;
use crate::config::SimulationConfig;
use crate::entity::{CombatState, EntityId, EntityInit, EntityTag, ResourceKind, TeamId};
use crate::output::{Event, OutputEnvelope};
use crate::simulation::Simulation;
use crate::skill::{
    Action, ActionTarget, ActionTimeline, ChargeProfile, SkillCatalog, SkillDefinition,
    TargetPreference, Targeting,
};

/// Tick length used by scenario tests.
pub const DT: f32 = 0.1;

pub const HERO_TEAM: TeamId = TeamId::new(1);
pub const FOE_TEAM: TeamId = TeamId::new(2);

// =============================================================================
// Simulations
// =============================================================================

/// A simulation with `skills` and a 0.1 s tick.
pub fn sim_with(skills: Vec<SkillDefinition>) -> Simulation {
    sim_with_config(skills, SimulationConfig::default().with_dt(DT))
}

pub fn sim_with_config(skills: Vec<SkillDefinition>, config: SimulationConfig) -> Simulation {
    let catalog = SkillCatalog::from_definitions(skills).unwrap();
    Simulation::new(config, catalog).unwrap()
}

/// A caster on the hero team with 100 health, 100 mana and 50 stamina.
pub fn spawn_hero(sim: &mut Simulation, position: Vec3) -> EntityId {
    let combat = CombatState::new(100.0, HERO_TEAM)
        .with_pool(ResourceKind::Mana, 100.0)
        .with_pool(ResourceKind::Stamina, 50.0);
    sim.spawn(
        EntityTag::Character,
        EntityInit::at_position(position).with_combat(combat),
    )
}

/// A second member of the hero team.
pub fn spawn_ally(sim: &mut Simulation, position: Vec3) -> EntityId {
    sim.spawn(
        EntityTag::Character,
        EntityInit::at_position(position).with_combat(CombatState::new(100.0, HERO_TEAM)),
    )
}

/// A target on the opposing team.
pub fn spawn_foe(sim: &mut Simulation, position: Vec3) -> EntityId {
    sim.spawn(
        EntityTag::Character,
        EntityInit::at_position(position).with_combat(CombatState::new(100.0, FOE_TEAM)),
    )
}

/// Steps `ticks` times and returns every event resolved along the way.
pub fn run(sim: &mut Simulation, ticks: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        sim.step();
        events.extend(sim.take_events().into_iter().filter_map(|e| e.event().cloned()));
    }
    events
}

/// Steps until `caster` is idle or `limit` ticks pass.
pub fn run_until_idle(sim: &mut Simulation, caster: EntityId, limit: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..limit {
        events.extend(run(sim, 1));
        if sim.phase(caster) == Some(crate::executor::SkillPhase::Idle) {
            break;
        }
    }
    events
}

pub fn health(sim: &Simulation, id: EntityId) -> f32 {
    sim.arena().get(id).map_or(0.0, |e| e.combat.health)
}

pub fn resource(sim: &Simulation, id: EntityId, kind: ResourceKind) -> f32 {
    sim.arena().get(id).map_or(0.0, |e| e.combat.available(kind))
}

/// Teleports an entity.
pub fn place(sim: &mut Simulation, id: EntityId, position: Vec3) {
    if let Some(entity) = sim.arena_mut().get_mut(id) {
        entity.transform.position = position;
    }
}

// =============================================================================
// Skills
// =============================================================================

/// Charged enemy-targeted bolt: 0.3 s required, 0.6 s full, 15 mana,
/// 25 damage at 0.1 s into the cast, 2 s cooldown.
pub fn bolt() -> SkillDefinition {
    SkillDefinition::new("bolt")
        .with_priority(1)
        .with_targeting(Targeting::targeted(TargetPreference::Enemy, 20.0))
        .with_charge(ChargeProfile::new(0.3, 0.6).cancelled_by_movement(true))
        .with_timeline(
            ActionTimeline::new()
                .then(0.0, Action::CollectCost { resource: ResourceKind::Mana, amount: 15.0, optional: false })
                .then(0.0, Action::ApplyCooldown { seconds: 2.0 })
                .then(0.0, Action::Cue { name: "bolt_release".into() })
                .then(0.1, Action::Damage { amount: 25.0, target: ActionTarget::Target }),
        )
}

/// Friendly heal that falls back to the caster.
pub fn mend() -> SkillDefinition {
    SkillDefinition::new("mend")
        .with_targeting(Targeting::targeted(TargetPreference::Friendly, 10.0))
        .with_timeline(
            ActionTimeline::new()
                .then(0.0, Action::CollectCost { resource: ResourceKind::Mana, amount: 10.0, optional: false })
                .then(0.2, Action::Heal { amount: 30.0, target: ActionTarget::Target }),
        )
}

/// An untargeted skill lasting `seconds` at `priority`.
pub fn channel(id: &str, priority: i32, seconds: f32) -> SkillDefinition {
    SkillDefinition::new(id)
        .with_priority(priority)
        .with_timeline(ActionTimeline::new().then(seconds, Action::Cue { name: format!("{id}_end") }))
}

// =============================================================================
// Presentation
// =============================================================================

/// Presentation sink that keeps every notified event.
#[derive(Default)]
pub struct RecordingPresentation {
    seen: Mutex<Vec<Event>>,
}

impl RecordingPresentation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Event> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Presentation for RecordingPresentation {
    fn notify(&self, event: &Event) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Event names in order, for sequence assertions.
pub fn event_names(events: &[Event]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            Event::ChargeStarted { .. } => "charge_started",
            Event::ChargeCancelled { .. } => "charge_cancelled",
            Event::CastStarted { .. } => "cast_started",
            Event::ActionFired { .. } => "action_fired",
            Event::CastCompleted { .. } => "cast_completed",
            Event::CastInterrupted { .. } => "cast_interrupted",
            Event::CooldownArmed { .. } => "cooldown_armed",
            Event::CueTriggered { .. } => "cue_triggered",
        })
        .collect()
}

/// Drains the simulation's events as envelopes.
pub fn drain(sim: &Simulation) -> Vec<OutputEnvelope> {
    sim.take_events()
}
