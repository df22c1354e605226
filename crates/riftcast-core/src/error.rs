//! Error types for the skill core.
//!
//! Two families:
//!
//! - [`CastRefusal`]: a cast request was refused. Non-fatal and leaves no
//!   state behind. [`CastRefusal::kind`] separates validation failures from
//!   preemption failures.
//! - [`ConfigError`]: skill or simulation data is malformed. Raised at load
//!   time.
//!
//! [`HostError`] covers direct motion operations issued by the host.
//!
//! Cancellation of a running cast is not an error; see
//! [`CancelReason`](crate::output::CancelReason).

use riftcast_motion::MotionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{EntityId, ResourceKind};
use crate::skill::{CasterState, LifeState, SkillId, StatusEffectId, StatusGroupId, TargetPreference};

/// Broad classification of a [`CastRefusal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefusalKind {
    /// The request does not satisfy the skill's requirements.
    Validation,
    /// Another cast holds precedence.
    Preemption,
}

/// Reasons a cast request is refused.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum CastRefusal {
    /// The caster is not in the arena.
    #[error("unknown caster {0}")]
    UnknownCaster(EntityId),

    /// No skill with this ID in the catalog.
    #[error("unknown skill {0}")]
    UnknownSkill(SkillId),

    /// Passive skills cannot be requested.
    #[error("skill {0} is passive")]
    PassiveSkill(SkillId),

    /// Dead entities cannot cast.
    #[error("caster is dead")]
    CasterDead,

    /// The skill's cooldown has not lapsed.
    #[error("skill {skill} is on cooldown for {remaining:.2}s")]
    OnCooldown {
        /// Requested skill.
        skill: SkillId,
        /// Seconds left.
        remaining: f32,
    },

    /// An active cast with equal or higher priority holds the caster.
    #[error("blocked by {active} (priority {active_priority} >= {requested_priority})")]
    Blocked {
        /// Skill currently active.
        active: SkillId,
        /// Its priority.
        active_priority: i32,
        /// Priority of the refused request.
        requested_priority: i32,
    },

    /// The active cast is not interruptible.
    #[error("active cast {active} cannot be interrupted")]
    Uninterruptible {
        /// Skill currently active.
        active: SkillId,
    },

    /// The caster's physical state does not match the skill.
    #[error("caster must be {required}")]
    CasterStateMismatch {
        /// Required state.
        required: CasterState,
    },

    /// A required status effect is missing or has too few stacks.
    #[error("requires status effect {effect} with at least {min_stacks} stacks")]
    MissingStatusEffect {
        /// Required effect.
        effect: StatusEffectId,
        /// Minimum stack count.
        min_stacks: u32,
    },

    /// No effect of a required group is held.
    #[error("requires any status effect in group {0}")]
    MissingStatusGroup(StatusGroupId),

    /// The skill needs a target and none was resolved.
    #[error("no valid target selected")]
    NoTarget,

    /// The selected target does not match the skill's preference.
    #[error("target {target} does not match preference {preference}")]
    TargetMismatch {
        /// Selected target.
        target: EntityId,
        /// Required preference.
        preference: TargetPreference,
    },

    /// The selected target is alive/dead when it must not be.
    #[error("target {target} must be {required}")]
    TargetLifeState {
        /// Selected target.
        target: EntityId,
        /// Required life state.
        required: LifeState,
    },

    /// The target is too far away.
    #[error("target is {distance:.2} away, range is {range:.2}")]
    OutOfRange {
        /// Distance to target.
        distance: f32,
        /// Skill range.
        range: f32,
    },

    /// The target is outside the allowed cone in front of the caster.
    #[error("target is {angle:.1} degrees off forward, max is {max_angle:.1}")]
    OutsideAngle {
        /// Angle from forward, in degrees.
        angle: f32,
        /// Allowed maximum, in degrees.
        max_angle: f32,
    },

    /// Line of sight to the target is blocked.
    #[error("no line of sight to target {target}")]
    NoLineOfSight {
        /// Selected target.
        target: EntityId,
    },

    /// The caster cannot pay the skill's required cost.
    #[error("needs {required:.1} {resource}, has {available:.1}")]
    InsufficientResource {
        /// Resource kind.
        resource: ResourceKind,
        /// Amount required.
        required: f32,
        /// Amount available.
        available: f32,
    },

    /// Skill data that should have been rejected at load time.
    #[error("skill {skill} is misconfigured: {reason}")]
    Misconfigured {
        /// Offending skill.
        skill: SkillId,
        /// What is wrong.
        reason: String,
    },
}

impl CastRefusal {
    /// Classifies this refusal.
    #[must_use]
    pub const fn kind(&self) -> RefusalKind {
        match self {
            Self::Blocked { .. } | Self::Uninterruptible { .. } => RefusalKind::Preemption,
            _ => RefusalKind::Validation,
        }
    }
}

/// Which timeline of a skill a configuration error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineKind {
    /// The main cast timeline.
    Main,
    /// The charge profile's pre-charge timeline.
    PreCharge,
}

impl std::fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Main => write!(f, "timeline"),
            Self::PreCharge => write!(f, "pre-charge timeline"),
        }
    }
}

/// Malformed skill or simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A skill needs a target but prefers none.
    #[error("skill {0} needs a target but its preference is None")]
    NeedsTargetWithoutPreference(SkillId),

    /// Full charge time is shorter than the required charge time.
    #[error("skill {skill}: full charge time {full} is below required charge time {required}")]
    ChargeTimeOrder {
        /// Offending skill.
        skill: SkillId,
        /// Required charge time.
        required: f32,
        /// Full charge time.
        full: f32,
    },

    /// A charge time is negative.
    #[error("skill {0} has a negative charge time")]
    NegativeChargeTime(SkillId),

    /// A timeline offset is negative.
    #[error("skill {skill}: {timeline} action {index} has a negative offset")]
    NegativeOffset {
        /// Offending skill.
        skill: SkillId,
        /// Which timeline.
        timeline: TimelineKind,
        /// Action index.
        index: usize,
    },

    /// A timeline offset is earlier than its predecessor.
    #[error("skill {skill}: {timeline} action {index} is scheduled before its predecessor")]
    DecreasingOffset {
        /// Offending skill.
        skill: SkillId,
        /// Which timeline.
        timeline: TimelineKind,
        /// Action index.
        index: usize,
    },

    /// Range or max angle is negative.
    #[error("skill {0} has a negative range or angle")]
    NegativeTargeting(SkillId),

    /// A cooldown, cost or effect amount is negative.
    #[error("skill {skill}: {timeline} action {index} has a negative amount")]
    NegativeAmount {
        /// Offending skill.
        skill: SkillId,
        /// Which timeline.
        timeline: TimelineKind,
        /// Action index.
        index: usize,
    },

    /// A launch angle is outside (0, 90) degrees.
    #[error("skill {skill}: launch angle {angle} is outside (0, 90) degrees")]
    InvalidLaunchAngle {
        /// Offending skill.
        skill: SkillId,
        /// The angle.
        angle: f32,
    },

    /// Two skills share an ID.
    #[error("duplicate skill id {0}")]
    DuplicateSkill(SkillId),

    /// A simulation parameter is out of range.
    #[error("invalid simulation config: {0}")]
    InvalidSimulation(String),

    /// The document is not valid JSON for the expected shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of host-issued motion operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    /// No entity with this ID exists.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// The motion layer rejected the request.
    #[error(transparent)]
    Motion(#[from] MotionError),
}

/// Result alias for host operations.
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Result alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias for cast requests.
pub type CastResult<T> = std::result::Result<T, CastRefusal>;
