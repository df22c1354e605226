//! # Riftcast Core
//!
//! Deterministic skill execution for real-time combat.
//!
//! Each entity owns a [`SkillExecutor`] that drives at most one active skill
//! through validation, an optional charge phase and a timed action
//! timeline. Executors read a snapshot of the arena and emit outputs;
//! resolvers apply those outputs to the next arena, following the
//! Entity-Executor-Resolver loop in [`simulation`].
//!
//! - **Skills**: immutable definitions loaded into a [`SkillCatalog`]
//! - **Executors**: cooldowns, preemption, charging and action firing
//! - **Resolvers**: physics (forces, launches, rotation), combat, events
//! - **Motion**: the [`motion`] crate's grounding, jumping and rotation
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec3;
//! use riftcast_core::{
//!     Action, ActionTarget, ActionTimeline, CombatState, EntityInit, EntityTag, SkillCatalog,
//!     SkillDefinition, SkillId, Simulation, SimulationConfig, TargetPreference, TeamId, Targeting,
//! };
//!
//! let slash = SkillDefinition::new("slash")
//!     .with_targeting(Targeting::targeted(TargetPreference::Enemy, 3.0))
//!     .with_timeline(ActionTimeline::new().then(0.0, Action::Damage {
//!         amount: 30.0,
//!         target: ActionTarget::Target,
//!     }));
//! let catalog = SkillCatalog::from_definitions([slash]).unwrap();
//! let mut sim = Simulation::new(SimulationConfig::default(), catalog).unwrap();
//!
//! let hero = sim.spawn(
//!     EntityTag::Character,
//!     EntityInit::at_position(Vec3::ZERO).with_combat(CombatState::new(100.0, TeamId::new(1))),
//! );
//! let foe = sim.spawn(
//!     EntityTag::Character,
//!     EntityInit::at_position(Vec3::new(0.0, 0.0, 2.0))
//!         .with_combat(CombatState::new(100.0, TeamId::new(2))),
//! );
//!
//! sim.request_cast(hero, &SkillId::new("slash"), Some(foe)).unwrap();
//! sim.step();
//! assert_eq!(sim.arena().get(foe).unwrap().combat.health, 70.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub use riftcast_motion as motion;

pub mod arena;
pub mod collab;
pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod output;
pub mod resolver;
pub mod simulation;
pub mod skill;
pub mod world_view;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use arena::Arena;
pub use collab::{Collaborators, Formulas, LineOfSight, Presentation, StatusEffects};
pub use config::{InterruptPolicy, SimulationConfig};
pub use entity::{CombatState, Entity, EntityId, EntityInit, EntityTag, ResourceKind, TeamId};
pub use error::{CastRefusal, ConfigError, HostError};
pub use executor::{CastTicket, SkillExecutor, SkillPhase};
pub use output::{CancelReason, Event, OutputEnvelope, TraceId};
pub use simulation::Simulation;
pub use skill::{
    Action, ActionTarget, ActionTimeline, ChargeProfile, SkillCatalog, SkillDefinition, SkillId,
    TargetPreference, Targeting,
};
