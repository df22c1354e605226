//! Static skill data.
//!
//! Everything in this module is immutable once loaded. A [`SkillDefinition`]
//! describes one skill; the [`SkillCatalog`] indexes them by [`SkillId`] and
//! hands out shared `Arc` references. Per-entity cast state lives in the
//! [`executor`](crate::executor) module, never here.

pub mod catalog;
pub mod charge;
pub mod timeline;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, TimelineKind};

pub use catalog::SkillCatalog;
pub use charge::ChargeProfile;
pub use timeline::{Action, ActionTarget, ActionTimeline, CostEntry, ForceFrame, TimedAction};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Unique skill identifier.
    SkillId
);
string_id!(
    /// Status effect identifier, resolved by the status-effect collaborator.
    StatusEffectId
);
string_id!(
    /// Status effect group identifier.
    StatusGroupId
);

// =============================================================================
// Classification Enums
// =============================================================================

/// Whether a skill can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Requested explicitly.
    #[default]
    Active,
    /// Always-on; never requested.
    Passive,
}

/// Which entities a skill may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPreference {
    /// Any entity.
    Any,
    /// Entities on a different team.
    Enemy,
    /// Entities on the caster's team, defaulting to the caster.
    Friendly,
    /// No target.
    #[default]
    None,
}

impl fmt::Display for TargetPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Enemy => write!(f, "enemy"),
            Self::Friendly => write!(f, "friendly"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Required life state of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    /// Health above zero.
    #[default]
    Alive,
    /// Health at zero.
    Dead,
    /// Either.
    Any,
}

impl LifeState {
    /// Returns true if an entity with the given liveness satisfies this.
    #[must_use]
    pub const fn accepts(self, alive: bool) -> bool {
        match self {
            Self::Alive => alive,
            Self::Dead => !alive,
            Self::Any => true,
        }
    }
}

impl fmt::Display for LifeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alive => write!(f, "alive"),
            Self::Dead => write!(f, "dead"),
            Self::Any => write!(f, "alive or dead"),
        }
    }
}

/// Required physical state of the caster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasterState {
    /// No requirement.
    #[default]
    Any,
    /// Must be grounded.
    Grounded,
    /// Must be airborne.
    Jumping,
}

impl CasterState {
    /// Returns true if a caster with the given grounded flag satisfies this.
    #[must_use]
    pub const fn accepts(self, grounded: bool) -> bool {
        match self {
            Self::Any => true,
            Self::Grounded => grounded,
            Self::Jumping => !grounded,
        }
    }
}

impl fmt::Display for CasterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "in any state"),
            Self::Grounded => write!(f, "grounded"),
            Self::Jumping => write!(f, "airborne"),
        }
    }
}

// =============================================================================
// Targeting and Requirements
// =============================================================================

/// Target constraints of a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targeting {
    /// Whether a target is resolved at all.
    pub needs_target: bool,
    /// Which entities qualify.
    pub preference: TargetPreference,
    /// Required life state.
    pub life_state: LifeState,
    /// Maximum distance.
    pub range: f32,
    /// Maximum angle between caster forward and target direction, in degrees.
    pub max_angle: f32,
    /// Target must be visible.
    pub requires_line_of_sight: bool,
}

impl Targeting {
    /// No target.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Requires a target with `preference` within `range` and any angle.
    #[must_use]
    pub fn targeted(preference: TargetPreference, range: f32) -> Self {
        Self {
            needs_target: true,
            preference,
            range,
            ..Self::default()
        }
    }

    /// Sets the angle limit (builder style).
    #[must_use]
    pub fn within_angle(mut self, max_angle: f32) -> Self {
        self.max_angle = max_angle;
        self
    }

    /// Sets the life-state requirement (builder style).
    #[must_use]
    pub fn requiring(mut self, life_state: LifeState) -> Self {
        self.life_state = life_state;
        self
    }

    /// Requires line of sight (builder style).
    #[must_use]
    pub fn with_line_of_sight(mut self) -> Self {
        self.requires_line_of_sight = true;
        self
    }
}

impl Default for Targeting {
    fn default() -> Self {
        Self {
            needs_target: false,
            preference: TargetPreference::None,
            life_state: LifeState::Alive,
            range: f32::MAX,
            max_angle: 180.0,
            requires_line_of_sight: false,
        }
    }
}

/// A required status effect with a minimum stack count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequirement {
    /// Required effect.
    pub effect: StatusEffectId,
    /// Minimum stacks.
    #[serde(default = "one")]
    pub min_stacks: u32,
}

fn one() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Skill Definition
// =============================================================================

/// Immutable description of one skill.
///
/// # Example
///
/// ```
/// use riftcast_core::skill::{Action, ActionTimeline, SkillDefinition, TargetPreference, Targeting};
///
/// let slash = SkillDefinition::new("slash")
///     .with_priority(1)
///     .with_targeting(Targeting::targeted(TargetPreference::Enemy, 3.0).within_angle(60.0))
///     .with_timeline(
///         ActionTimeline::new()
///             .then(0.0, Action::ApplyCooldown { seconds: 2.0 })
///             .then(0.3, Action::Damage { amount: 20.0, target: Default::default() }),
///     );
///
/// assert!(slash.validate().is_ok());
/// assert!((slash.cooldown() - 2.0).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Unique identifier.
    pub id: SkillId,
    /// Active or passive.
    #[serde(default)]
    pub activation: Activation,
    /// Whether other requests may preempt this cast, and (under
    /// `InterruptPolicy::SelfViolations`) whether its own violations cancel it.
    #[serde(default = "default_true")]
    pub interruptible: bool,
    /// Preemption precedence.
    #[serde(default)]
    pub priority: i32,
    /// Charge phase, if any.
    #[serde(default)]
    pub charge: Option<ChargeProfile>,
    /// Main cast timeline.
    #[serde(default)]
    pub timeline: ActionTimeline,
    /// Target constraints.
    #[serde(default)]
    pub targeting: Targeting,
    /// Required caster physical state.
    #[serde(default)]
    pub caster_state: CasterState,
    /// Any successful move cancels the cast.
    #[serde(default)]
    pub movement_cancels_skill: bool,
    /// Status effects the caster must hold.
    #[serde(default)]
    pub required_effects: Vec<StatusRequirement>,
    /// Groups of which the caster must hold any effect.
    #[serde(default)]
    pub required_groups: Vec<StatusGroupId>,
}

impl SkillDefinition {
    /// An active, interruptible, untargeted skill with an empty timeline.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: SkillId::new(id),
            activation: Activation::Active,
            interruptible: true,
            priority: 0,
            charge: None,
            timeline: ActionTimeline::new(),
            targeting: Targeting::none(),
            caster_state: CasterState::Any,
            movement_cancels_skill: false,
            required_effects: Vec::new(),
            required_groups: Vec::new(),
        }
    }

    /// Sets the priority (builder style).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the timeline (builder style).
    #[must_use]
    pub fn with_timeline(mut self, timeline: ActionTimeline) -> Self {
        self.timeline = timeline;
        self
    }

    /// Sets the charge profile (builder style).
    #[must_use]
    pub fn with_charge(mut self, charge: ChargeProfile) -> Self {
        self.charge = Some(charge);
        self
    }

    /// Sets the targeting (builder style).
    #[must_use]
    pub fn with_targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    /// Sets the caster-state requirement (builder style).
    #[must_use]
    pub fn with_caster_state(mut self, state: CasterState) -> Self {
        self.caster_state = state;
        self
    }

    /// Sets the interruptible flag (builder style).
    #[must_use]
    pub fn interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Sets whether movement cancels the cast (builder style).
    #[must_use]
    pub fn cancelled_by_movement(mut self, cancels: bool) -> Self {
        self.movement_cancels_skill = cancels;
        self
    }

    /// Marks the skill passive (builder style).
    #[must_use]
    pub fn passive(mut self) -> Self {
        self.activation = Activation::Passive;
        self
    }

    /// Adds a status-effect requirement (builder style).
    #[must_use]
    pub fn requiring_effect(mut self, effect: impl Into<String>, min_stacks: u32) -> Self {
        self.required_effects.push(StatusRequirement {
            effect: StatusEffectId::new(effect),
            min_stacks,
        });
        self
    }

    /// Adds a status-group requirement (builder style).
    #[must_use]
    pub fn requiring_group(mut self, group: impl Into<String>) -> Self {
        self.required_groups.push(StatusGroupId::new(group));
        self
    }

    /// Derived cooldown of the main timeline.
    #[must_use]
    pub fn cooldown(&self) -> f32 {
        self.timeline.cooldown()
    }

    /// Returns true if this skill can be requested.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.activation == Activation::Active
    }

    /// Checks the definition for configuration errors.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.targeting.needs_target && self.targeting.preference == TargetPreference::None {
            return Err(ConfigError::NeedsTargetWithoutPreference(self.id.clone()));
        }
        if self.targeting.range < 0.0 || self.targeting.max_angle < 0.0 {
            return Err(ConfigError::NegativeTargeting(self.id.clone()));
        }
        if let Some(charge) = &self.charge {
            charge.validate(&self.id)?;
        }
        self.timeline.validate(&self.id, TimelineKind::Main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod id_tests {
        use super::*;

        #[test]
        fn display_and_transparent_serde() {
            let id = SkillId::new("fireball");
            assert_eq!(id.to_string(), "fireball");
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"fireball\"");
            let back: SkillId = serde_json::from_str("\"fireball\"").unwrap();
            assert_eq!(back, id);
        }

        #[test]
        fn ids_order_lexically() {
            assert!(SkillId::from("a") < SkillId::from("b"));
        }
    }

    mod state_tests {
        use super::*;

        #[test]
        fn caster_state_acceptance() {
            assert!(CasterState::Any.accepts(true));
            assert!(CasterState::Any.accepts(false));
            assert!(CasterState::Grounded.accepts(true));
            assert!(!CasterState::Grounded.accepts(false));
            assert!(CasterState::Jumping.accepts(false));
            assert!(!CasterState::Jumping.accepts(true));
        }

        #[test]
        fn life_state_acceptance() {
            assert!(LifeState::Alive.accepts(true));
            assert!(!LifeState::Alive.accepts(false));
            assert!(LifeState::Dead.accepts(false));
            assert!(LifeState::Any.accepts(false));
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn needs_target_requires_preference() {
            let mut skill = SkillDefinition::new("bad");
            skill.targeting.needs_target = true;
            assert!(matches!(
                skill.validate(),
                Err(ConfigError::NeedsTargetWithoutPreference(_))
            ));
        }

        #[test]
        fn negative_range_rejected() {
            let skill = SkillDefinition::new("bad")
                .with_targeting(Targeting::targeted(TargetPreference::Any, -1.0));
            assert!(matches!(skill.validate(), Err(ConfigError::NegativeTargeting(_))));
        }

        #[test]
        fn charge_profile_checked() {
            let skill = SkillDefinition::new("bad").with_charge(ChargeProfile::new(3.0, 1.0));
            assert!(matches!(skill.validate(), Err(ConfigError::ChargeTimeOrder { .. })));
        }

        #[test]
        fn plain_skill_is_valid() {
            assert!(SkillDefinition::new("ok").validate().is_ok());
        }
    }

    #[test]
    fn loads_minimal_json_with_defaults() {
        let skill: SkillDefinition = serde_json::from_str(r#"{ "id": "kick" }"#).unwrap();
        assert_eq!(skill.id, SkillId::new("kick"));
        assert!(skill.interruptible);
        assert!(skill.is_active());
        assert_eq!(skill.targeting, Targeting::none());
        assert_eq!(skill.cooldown(), 0.0);
    }

    #[test]
    fn loads_requirements() {
        let json = r#"{
            "id": "finisher",
            "priority": 3,
            "caster_state": "grounded",
            "required_effects": [{ "effect": "combo", "min_stacks": 3 }, { "effect": "focus" }],
            "required_groups": ["stance"],
            "targeting": { "needs_target": true, "preference": "enemy", "range": 4.0 }
        }"#;
        let skill: SkillDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(skill.caster_state, CasterState::Grounded);
        assert_eq!(skill.required_effects[1].min_stacks, 1);
        assert_eq!(skill.required_groups, vec![StatusGroupId::new("stance")]);
        assert_eq!(skill.targeting.life_state, LifeState::Alive);
        assert!((skill.targeting.max_angle - 180.0).abs() < f32::EPSILON);
        assert!(skill.validate().is_ok());
    }
}
