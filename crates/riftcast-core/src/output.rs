//! Outputs emitted by skill executors and host requests.
//!
//! Outputs are proposals. Executors read a snapshot of the arena and describe
//! what should happen; resolvers apply those proposals to the next arena.
//!
//! - [`Command`]: motion changes (`ApplyForce`, `Launch`)
//! - [`Modifier`]: value changes (`ApplyDamage`, `ApplyHealing`, `CollectCost`)
//! - [`Event`]: skill lifecycle notifications
//!
//! Every output travels in an [`OutputEnvelope`] carrying the emitting entity,
//! the cast's [`TraceId`], the tick and a per-emitter sequence number.
//!
//! # Example
//!
//! ```
//! use riftcast_core::output::{Event, Output, OutputEnvelope, OutputKind, TraceId};
//! use riftcast_core::entity::EntityId;
//! use riftcast_core::skill::SkillId;
//!
//! let envelope = OutputEnvelope::new(
//!     Output::Event(Event::CastCompleted {
//!         caster: EntityId::new(1),
//!         skill: SkillId::new("slash"),
//!     }),
//!     EntityId::new(1),
//!     TraceId::new(7),
//!     30, // tick
//!     2,  // sequence
//! );
//!
//! assert_eq!(envelope.output().kind(), OutputKind::Event);
//! assert_eq!(envelope.trace_id().to_string(), "trace:7");
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::{EntityId, ResourceKind};
use crate::error::CastRefusal;
use crate::skill::SkillId;

// =============================================================================
// Tracing Types
// =============================================================================

/// Groups every output of one cast, from request to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraceId(u64);

impl TraceId {
    /// Creates a new trace ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value of this trace ID.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace:{}", self.0)
    }
}

impl From<u64> for TraceId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<TraceId> for u64 {
    fn from(id: TraceId) -> Self {
        id.0
    }
}

// =============================================================================
// Output Categories
// =============================================================================

/// Motion changes requested by a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Add an impulse to an entity's velocity.
    ApplyForce {
        /// Entity to push.
        target: EntityId,
        /// World-space impulse.
        force: Vec3,
    },
    /// Launch an entity on a ballistic arc.
    Launch {
        /// Entity to launch.
        target: EntityId,
        /// Landing point.
        destination: Vec3,
        /// Launch angle in degrees.
        angle_degrees: f32,
    },
}

impl Command {
    /// Returns the entity this command moves.
    #[must_use]
    pub const fn target(&self) -> EntityId {
        match self {
            Self::ApplyForce { target, .. } | Self::Launch { target, .. } => *target,
        }
    }
}

/// Value changes requested by a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Modifier {
    /// Reduce health.
    ApplyDamage {
        /// Casting entity.
        source: EntityId,
        /// Damaged entity.
        target: EntityId,
        /// Amount, already scaled by potency.
        amount: f32,
    },
    /// Restore health.
    ApplyHealing {
        /// Casting entity.
        source: EntityId,
        /// Healed entity.
        target: EntityId,
        /// Amount, already scaled by potency.
        amount: f32,
    },
    /// Deduct a resource.
    CollectCost {
        /// Paying entity.
        target: EntityId,
        /// Pool to draw from.
        resource: ResourceKind,
        /// Amount.
        amount: f32,
    },
}

impl Modifier {
    /// Returns the entity whose values change.
    #[must_use]
    pub const fn target(&self) -> EntityId {
        match self {
            Self::ApplyDamage { target, .. }
            | Self::ApplyHealing { target, .. }
            | Self::CollectCost { target, .. } => *target,
        }
    }
}

/// Why an in-progress charge or cast ended early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CancelReason {
    /// The caster's health reached zero.
    CasterDied,
    /// The caster moved and the skill forbids it.
    Moved,
    /// The caster's physical state no longer matches.
    CasterState,
    /// The target no longer passes validation.
    TargetInvalid(CastRefusal),
    /// A required cost can no longer be paid.
    ResourcesDepleted,
    /// A higher-priority skill replaced this one.
    Preempted {
        /// The replacing skill.
        by: SkillId,
    },
    /// The host cancelled the cast.
    Manual,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CasterDied => write!(f, "caster died"),
            Self::Moved => write!(f, "caster moved"),
            Self::CasterState => write!(f, "caster state changed"),
            Self::TargetInvalid(refusal) => write!(f, "target invalid: {refusal}"),
            Self::ResourcesDepleted => write!(f, "resources depleted"),
            Self::Preempted { by } => write!(f, "preempted by {by}"),
            Self::Manual => write!(f, "cancelled"),
        }
    }
}

/// Skill lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Charging began.
    ChargeStarted {
        /// Casting entity.
        caster: EntityId,
        /// Skill being charged.
        skill: SkillId,
        /// Resolved target.
        target: Option<EntityId>,
    },
    /// Charging ended without a cast.
    ChargeCancelled {
        /// Casting entity.
        caster: EntityId,
        /// Skill that was charging.
        skill: SkillId,
        /// Why.
        reason: CancelReason,
    },
    /// The main timeline began.
    CastStarted {
        /// Casting entity.
        caster: EntityId,
        /// Skill being cast.
        skill: SkillId,
        /// Resolved target.
        target: Option<EntityId>,
        /// Charge potency applied to effect amounts.
        potency: f32,
    },
    /// A timeline action fired.
    ActionFired {
        /// Casting entity.
        caster: EntityId,
        /// Skill being cast.
        skill: SkillId,
        /// Index within its timeline.
        index: usize,
        /// Whether it came from the pre-charge timeline.
        pre_charge: bool,
    },
    /// Every action fired.
    CastCompleted {
        /// Casting entity.
        caster: EntityId,
        /// Completed skill.
        skill: SkillId,
    },
    /// Casting ended early.
    CastInterrupted {
        /// Casting entity.
        caster: EntityId,
        /// Interrupted skill.
        skill: SkillId,
        /// Why.
        reason: CancelReason,
    },
    /// A cooldown started.
    CooldownArmed {
        /// Casting entity.
        caster: EntityId,
        /// Skill now cooling down.
        skill: SkillId,
        /// Cooldown length.
        seconds: f32,
    },
    /// A presentation cue fired.
    CueTriggered {
        /// Casting entity.
        caster: EntityId,
        /// Skill being cast.
        skill: SkillId,
        /// Cue name.
        name: String,
    },
}

impl Event {
    /// Returns the casting entity.
    #[must_use]
    pub const fn caster(&self) -> EntityId {
        match self {
            Self::ChargeStarted { caster, .. }
            | Self::ChargeCancelled { caster, .. }
            | Self::CastStarted { caster, .. }
            | Self::ActionFired { caster, .. }
            | Self::CastCompleted { caster, .. }
            | Self::CastInterrupted { caster, .. }
            | Self::CooldownArmed { caster, .. }
            | Self::CueTriggered { caster, .. } => *caster,
        }
    }

    /// Returns the skill involved.
    #[must_use]
    pub const fn skill(&self) -> &SkillId {
        match self {
            Self::ChargeStarted { skill, .. }
            | Self::ChargeCancelled { skill, .. }
            | Self::CastStarted { skill, .. }
            | Self::ActionFired { skill, .. }
            | Self::CastCompleted { skill, .. }
            | Self::CastInterrupted { skill, .. }
            | Self::CooldownArmed { skill, .. }
            | Self::CueTriggered { skill, .. } => skill,
        }
    }

    /// Returns the cancel reason for cancellation events.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<&CancelReason> {
        match self {
            Self::ChargeCancelled { reason, .. } | Self::CastInterrupted { reason, .. } => {
                Some(reason)
            }
            _ => None,
        }
    }
}

// =============================================================================
// Top-Level Output Enum
// =============================================================================

/// Output kind for resolver routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    /// Motion changes.
    Command,
    /// Value changes.
    Modifier,
    /// Notifications.
    Event,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "Command"),
            Self::Modifier => write!(f, "Modifier"),
            Self::Event => write!(f, "Event"),
        }
    }
}

/// Any output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// A motion change.
    Command(Command),
    /// A value change.
    Modifier(Modifier),
    /// A notification.
    Event(Event),
}

impl Output {
    /// Returns the kind of this output for resolver routing.
    #[must_use]
    pub const fn kind(&self) -> OutputKind {
        match self {
            Self::Command(_) => OutputKind::Command,
            Self::Modifier(_) => OutputKind::Modifier,
            Self::Event(_) => OutputKind::Event,
        }
    }

    /// Returns the command if this is a command output.
    #[must_use]
    pub const fn as_command(&self) -> Option<&Command> {
        match self {
            Self::Command(cmd) => Some(cmd),
            _ => None,
        }
    }

    /// Returns the modifier if this is a modifier output.
    #[must_use]
    pub const fn as_modifier(&self) -> Option<&Modifier> {
        match self {
            Self::Modifier(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the event if this is an event output.
    #[must_use]
    pub const fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Command> for Output {
    fn from(cmd: Command) -> Self {
        Self::Command(cmd)
    }
}

impl From<Modifier> for Output {
    fn from(m: Modifier) -> Self {
        Self::Modifier(m)
    }
}

impl From<Event> for Output {
    fn from(e: Event) -> Self {
        Self::Event(e)
    }
}

// =============================================================================
// Output Envelope
// =============================================================================

/// An output plus the metadata that orders and traces it.
///
/// Within a tick, envelopes are resolved in `(source, sequence)` order, after
/// any envelopes queued by host requests since the previous tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEnvelope {
    output: Output,
    source: EntityId,
    trace_id: TraceId,
    tick: u64,
    sequence: u32,
}

impl OutputEnvelope {
    /// Creates a new output envelope.
    ///
    /// # Arguments
    ///
    /// * `output` - The output to wrap
    /// * `source` - The entity whose executor emitted it
    /// * `trace_id` - The cast this output belongs to
    /// * `tick` - Tick of emission
    /// * `sequence` - Position among the source's outputs this tick
    #[must_use]
    pub fn new(output: Output, source: EntityId, trace_id: TraceId, tick: u64, sequence: u32) -> Self {
        Self {
            output,
            source,
            trace_id,
            tick,
            sequence,
        }
    }

    /// Returns a reference to the wrapped output.
    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Consumes the envelope and returns the wrapped output.
    #[must_use]
    pub fn into_output(self) -> Output {
        self.output
    }

    /// Returns the emitting entity.
    #[must_use]
    pub const fn source(&self) -> EntityId {
        self.source
    }

    /// Returns the trace ID.
    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Returns the tick when this output was emitted.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Returns the sequence number.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Returns the wrapped event, if this envelope carries one.
    #[must_use]
    pub const fn event(&self) -> Option<&Event> {
        self.output.as_event()
    }
}

/// Sequences the outputs of one emitter for one tick.
///
/// Each emitted output gets the next sequence number, so the order of
/// `emit` calls is the order of resolution.
#[derive(Debug)]
pub struct OutputBuffer {
    source: EntityId,
    tick: u64,
    next_sequence: u32,
    outputs: Vec<OutputEnvelope>,
}

impl OutputBuffer {
    /// Creates an empty buffer for `source` at `tick`.
    #[must_use]
    pub fn new(source: EntityId, tick: u64) -> Self {
        Self {
            source,
            tick,
            next_sequence: 0,
            outputs: Vec::new(),
        }
    }

    /// Appends an output under `trace_id`.
    pub fn emit(&mut self, trace_id: TraceId, output: impl Into<Output>) {
        self.outputs.push(OutputEnvelope::new(
            output.into(),
            self.source,
            trace_id,
            self.tick,
            self.next_sequence,
        ));
        self.next_sequence += 1;
    }

    /// Number of buffered outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Buffered envelopes in emission order.
    #[must_use]
    pub fn envelopes(&self) -> &[OutputEnvelope] {
        &self.outputs
    }

    /// Consumes the buffer.
    #[must_use]
    pub fn into_envelopes(self) -> Vec<OutputEnvelope> {
        self.outputs
    }
}

// =============================================================================
// Tests
// =============================================================================
