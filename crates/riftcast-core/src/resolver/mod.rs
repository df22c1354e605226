//! Resolvers apply executor outputs to the next arena.
//!
//! Each resolver declares the output kinds it handles via
//! [`Resolver::handles()`]. During a step the simulation routes the sorted
//! outputs to every resolver whose kinds match, in a fixed order:
//! physics, then combat, then events.
//!
//! # Invariants
//!
//! - Resolvers read lookups from `current` and write only to `next`
//! - Given the same outputs in the same order, a resolver produces the same
//!   `next`
//!
//! # Available Resolvers
//!
//! - [`PhysicsResolver`]: forces, launches and motion integration
//! - [`CombatResolver`]: damage, healing and resource costs
//! - [`EventResolver`]: event log and presentation hooks

mod combat;
mod event;
mod physics;

pub use combat::CombatResolver;
pub use event::EventResolver;
pub use physics::PhysicsResolver;

use crate::arena::Arena;
use crate::output::{OutputEnvelope, OutputKind};

/// Applies routed outputs to the next arena.
///
/// # Example
///
/// ```
/// use riftcast_core::arena::Arena;
/// use riftcast_core::output::{OutputEnvelope, OutputKind};
/// use riftcast_core::resolver::Resolver;
///
/// struct CountCommands;
///
/// impl Resolver for CountCommands {
///     fn handles(&self) -> &[OutputKind] {
///         &[OutputKind::Command]
///     }
///
///     fn resolve(&self, outputs: &[&OutputEnvelope], _current: &Arena, _next: &mut Arena) {
///         println!("{} commands", outputs.len());
///     }
/// }
/// ```
pub trait Resolver: Send + Sync {
    /// Output kinds this resolver receives.
    fn handles(&self) -> &[OutputKind];

    /// Applies `outputs` to `next`.
    ///
    /// # Arguments
    ///
    /// * `outputs` - Outputs whose kind is in [`handles()`](Self::handles), in resolution order
    /// * `current` - The arena the outputs were produced from
    /// * `next` - The arena to mutate
    fn resolve(&self, outputs: &[&OutputEnvelope], current: &Arena, next: &mut Arena);
}
