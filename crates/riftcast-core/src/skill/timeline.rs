//! Timed sub-actions and the timelines that order them.
//!
//! An [`ActionTimeline`] is the list of things a skill does, each scheduled at
//! an offset (seconds) from the start of its phase. Order in the list is
//! execution order; offsets never decrease along it.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::entity::ResourceKind;
use crate::error::{ConfigError, ConfigResult, TimelineKind};

use super::SkillId;

/// Who an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTarget {
    /// The casting entity.
    Caster,
    /// The cast's resolved target.
    #[default]
    Target,
}

/// Reference frame for a force action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceFrame {
    /// World axes.
    #[default]
    World,
    /// Rotated by the caster's facing (+Z is the caster's forward).
    Caster,
}

/// A single sub-action of a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Deduct a resource from the caster.
    CollectCost {
        /// Pool to draw from.
        resource: ResourceKind,
        /// Amount to deduct.
        amount: f32,
        /// Optional costs are collected only if affordable and never gate
        /// the cast.
        #[serde(default)]
        optional: bool,
    },
    /// Arm the skill's cooldown.
    ApplyCooldown {
        /// Cooldown length.
        seconds: f32,
    },
    /// Reduce health.
    Damage {
        /// Base amount, scaled by charge potency.
        amount: f32,
        /// Recipient.
        #[serde(default)]
        target: ActionTarget,
    },
    /// Restore health.
    Heal {
        /// Base amount, scaled by charge potency.
        amount: f32,
        /// Recipient.
        #[serde(default)]
        target: ActionTarget,
    },
    /// Add an impulse to a velocity.
    Force {
        /// Impulse vector.
        force: Vec3,
        /// Recipient.
        #[serde(default)]
        target: ActionTarget,
        /// Frame `force` is expressed in.
        #[serde(default)]
        frame: ForceFrame,
    },
    /// Launch the caster on a ballistic arc toward an entity's position.
    Launch {
        /// Whose position to land on.
        #[serde(default)]
        target: ActionTarget,
        /// Launch angle in degrees, in (0, 90).
        angle_degrees: f32,
    },
    /// Presentation cue (animation, sound, VFX). No state change.
    Cue {
        /// Cue name handed to the presentation layer.
        name: String,
    },
}

impl Action {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CollectCost { .. } => "collect_cost",
            Self::ApplyCooldown { .. } => "apply_cooldown",
            Self::Damage { .. } => "damage",
            Self::Heal { .. } => "heal",
            Self::Force { .. } => "force",
            Self::Launch { .. } => "launch",
            Self::Cue { .. } => "cue",
        }
    }

    /// The entity role this action affects, if it affects one.
    #[must_use]
    pub const fn action_target(&self) -> Option<ActionTarget> {
        match self {
            Self::Damage { target, .. }
            | Self::Heal { target, .. }
            | Self::Force { target, .. }
            | Self::Launch { target, .. } => Some(*target),
            Self::CollectCost { .. } | Self::ApplyCooldown { .. } | Self::Cue { .. } => None,
        }
    }
}

/// A required resource payment extracted from a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    /// Pool to draw from.
    pub resource: ResourceKind,
    /// Amount.
    pub amount: f32,
}

/// An action scheduled at an offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedAction {
    /// Seconds from the start of the phase.
    #[serde(default)]
    pub offset: f32,
    /// What happens.
    #[serde(flatten)]
    pub action: Action,
}

impl TimedAction {
    /// Creates a timed action.
    #[must_use]
    pub fn new(offset: f32, action: Action) -> Self {
        Self { offset, action }
    }

    /// Creates an action at offset zero.
    #[must_use]
    pub fn immediate(action: Action) -> Self {
        Self::new(0.0, action)
    }
}

/// Ordered list of timed actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTimeline {
    actions: Vec<TimedAction>,
}

impl ActionTimeline {
    /// Creates an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a timeline from actions in execution order.
    #[must_use]
    pub fn from_actions(actions: Vec<TimedAction>) -> Self {
        Self { actions }
    }

    /// Appends an action (builder style).
    #[must_use]
    pub fn then(mut self, offset: f32, action: Action) -> Self {
        self.actions.push(TimedAction::new(offset, action));
        self
    }

    /// Actions in execution order.
    #[must_use]
    pub fn actions(&self) -> &[TimedAction] {
        &self.actions
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True when there are no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Cooldown of the first `ApplyCooldown` action, or 0.
    #[must_use]
    pub fn cooldown(&self) -> f32 {
        self.actions
            .iter()
            .find_map(|timed| match timed.action {
                Action::ApplyCooldown { seconds } => Some(seconds),
                _ => None,
            })
            .unwrap_or(0.0)
    }

    /// Non-optional costs in timeline order.
    #[must_use]
    pub fn cost(&self) -> Vec<CostEntry> {
        self.actions
            .iter()
            .filter_map(|timed| match timed.action {
                Action::CollectCost {
                    resource,
                    amount,
                    optional: false,
                } => Some(CostEntry { resource, amount }),
                _ => None,
            })
            .collect()
    }

    /// Offset of the last action, or 0 for an empty timeline.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.actions.last().map_or(0.0, |timed| timed.offset)
    }

    /// Total required cost per resource.
    #[must_use]
    pub fn required_resources(&self) -> BTreeMap<ResourceKind, f32> {
        Self::sum_costs(self.cost())
    }

    /// Total non-optional cost per resource of actions at `from` and later.
    #[must_use]
    pub fn remaining_required_resources(&self, from: usize) -> BTreeMap<ResourceKind, f32> {
        let tail = Self::from_actions(self.actions.get(from..).unwrap_or_default().to_vec());
        tail.required_resources()
    }

    fn sum_costs(costs: Vec<CostEntry>) -> BTreeMap<ResourceKind, f32> {
        let mut totals = BTreeMap::new();
        for entry in costs {
            *totals.entry(entry.resource).or_insert(0.0) += entry.amount;
        }
        totals
    }

    /// Checks offsets and amounts.
    ///
    /// # Errors
    ///
    /// Returns the first offending action as a [`ConfigError`].
    pub fn validate(&self, skill: &SkillId, timeline: TimelineKind) -> ConfigResult<()> {
        let mut previous = 0.0f32;
        for (index, timed) in self.actions.iter().enumerate() {
            if timed.offset < 0.0 || !timed.offset.is_finite() {
                return Err(ConfigError::NegativeOffset {
                    skill: skill.clone(),
                    timeline,
                    index,
                });
            }
            if timed.offset < previous {
                return Err(ConfigError::DecreasingOffset {
                    skill: skill.clone(),
                    timeline,
                    index,
                });
            }
            previous = timed.offset;

            let negative = match &timed.action {
                Action::CollectCost { amount, .. }
                | Action::Damage { amount, .. }
                | Action::Heal { amount, .. } => *amount < 0.0,
                Action::ApplyCooldown { seconds } => *seconds < 0.0,
                Action::Launch { angle_degrees, .. } => {
                    if !(*angle_degrees > 0.0 && *angle_degrees < 90.0) {
                        return Err(ConfigError::InvalidLaunchAngle {
                            skill: skill.clone(),
                            angle: *angle_degrees,
                        });
                    }
                    false
                }
                Action::Force { .. } | Action::Cue { .. } => false,
            };
            if negative {
                return Err(ConfigError::NegativeAmount {
                    skill: skill.clone(),
                    timeline,
                    index,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(resource: ResourceKind, amount: f32, optional: bool) -> Action {
        Action::CollectCost {
            resource,
            amount,
            optional,
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn cooldown_is_zero_without_apply_cooldown() {
            let timeline = ActionTimeline::new()
                .then(0.0, cost(ResourceKind::Mana, 10.0, false))
                .then(0.2, Action::Cue { name: "swing".into() });
            assert_eq!(timeline.cooldown(), 0.0);
            assert_eq!(ActionTimeline::new().cooldown(), 0.0);
        }

        #[test]
        fn cooldown_takes_first_apply_cooldown() {
            let timeline = ActionTimeline::new()
                .then(0.0, Action::Cue { name: "a".into() })
                .then(0.1, Action::ApplyCooldown { seconds: 4.0 })
                .then(0.2, Action::Damage { amount: 5.0, target: ActionTarget::Target })
                .then(0.3, Action::ApplyCooldown { seconds: 9.0 });
            assert!((timeline.cooldown() - 4.0).abs() < f32::EPSILON);
        }

        #[test]
        fn cost_skips_optional_and_keeps_order() {
            let timeline = ActionTimeline::new()
                .then(0.0, cost(ResourceKind::Stamina, 5.0, false))
                .then(0.0, cost(ResourceKind::Mana, 99.0, true))
                .then(0.5, cost(ResourceKind::Mana, 10.0, false))
                .then(0.6, cost(ResourceKind::Stamina, 2.0, false));
            let costs = timeline.cost();
            assert_eq!(
                costs,
                vec![
                    CostEntry { resource: ResourceKind::Stamina, amount: 5.0 },
                    CostEntry { resource: ResourceKind::Mana, amount: 10.0 },
                    CostEntry { resource: ResourceKind::Stamina, amount: 2.0 },
                ]
            );
        }

        #[test]
        fn required_resources_sums_per_kind() {
            let timeline = ActionTimeline::new()
                .then(0.0, cost(ResourceKind::Stamina, 5.0, false))
                .then(0.1, cost(ResourceKind::Stamina, 2.5, false))
                .then(0.2, cost(ResourceKind::Mana, 1.0, true));
            let totals = timeline.required_resources();
            assert_eq!(totals.len(), 1);
            assert!((totals[&ResourceKind::Stamina] - 7.5).abs() < f32::EPSILON);
        }

        #[test]
        fn remaining_resources_skip_fired_actions() {
            let timeline = ActionTimeline::new()
                .then(0.0, cost(ResourceKind::Mana, 5.0, false))
                .then(0.5, cost(ResourceKind::Mana, 3.0, false));
            let rest = timeline.remaining_required_resources(1);
            assert!((rest[&ResourceKind::Mana] - 3.0).abs() < f32::EPSILON);
            assert!(timeline.remaining_required_resources(5).is_empty());
        }

        #[test]
        fn duration_is_last_offset() {
            let timeline = ActionTimeline::new()
                .then(0.0, Action::Cue { name: "a".into() })
                .then(1.25, Action::Cue { name: "b".into() });
            assert!((timeline.duration() - 1.25).abs() < f32::EPSILON);
            assert_eq!(ActionTimeline::new().duration(), 0.0);
        }
    }

    mod validate_tests {
        use super::*;

        fn skill() -> SkillId {
            SkillId::new("test")
        }

        #[test]
        fn accepts_equal_offsets() {
            let timeline = ActionTimeline::new()
                .then(0.5, Action::Cue { name: "a".into() })
                .then(0.5, Action::Cue { name: "b".into() });
            assert!(timeline.validate(&skill(), TimelineKind::Main).is_ok());
        }

        #[test]
        fn rejects_negative_offset() {
            let timeline = ActionTimeline::new().then(-0.1, Action::Cue { name: "a".into() });
            assert!(matches!(
                timeline.validate(&skill(), TimelineKind::Main),
                Err(ConfigError::NegativeOffset { index: 0, .. })
            ));
        }

        #[test]
        fn rejects_decreasing_offset() {
            let timeline = ActionTimeline::new()
                .then(1.0, Action::Cue { name: "a".into() })
                .then(0.5, Action::Cue { name: "b".into() });
            assert!(matches!(
                timeline.validate(&skill(), TimelineKind::PreCharge),
                Err(ConfigError::DecreasingOffset {
                    index: 1,
                    timeline: TimelineKind::PreCharge,
                    ..
                })
            ));
        }

        #[test]
        fn rejects_negative_amounts() {
            let timeline = ActionTimeline::new().then(0.0, Action::ApplyCooldown { seconds: -1.0 });
            assert!(matches!(
                timeline.validate(&skill(), TimelineKind::Main),
                Err(ConfigError::NegativeAmount { .. })
            ));
            let timeline = ActionTimeline::new().then(0.0, cost(ResourceKind::Mana, -5.0, true));
            assert!(timeline.validate(&skill(), TimelineKind::Main).is_err());
        }

        #[test]
        fn rejects_bad_launch_angle() {
            for angle in [0.0, 90.0, 135.0] {
                let timeline = ActionTimeline::new().then(
                    0.0,
                    Action::Launch { target: ActionTarget::Target, angle_degrees: angle },
                );
                assert!(matches!(
                    timeline.validate(&skill(), TimelineKind::Main),
                    Err(ConfigError::InvalidLaunchAngle { .. })
                ));
            }
        }
    }

    #[test]
    fn actions_load_from_tagged_json() {
        let json = r#"[
            { "offset": 0.0, "type": "collect_cost", "resource": "mana", "amount": 10.0 },
            { "offset": 0.2, "type": "damage", "amount": 25.0 },
            { "offset": 0.2, "type": "force", "force": [0.0, 2.0, 5.0], "frame": "caster" },
            { "offset": 0.4, "type": "apply_cooldown", "seconds": 3.0 }
        ]"#;
        let timeline: ActionTimeline = serde_json::from_str(json).unwrap();
        assert_eq!(timeline.len(), 4);
        assert_eq!(
            timeline.actions()[0].action,
            cost(ResourceKind::Mana, 10.0, false)
        );
        assert_eq!(
            timeline.actions()[1].action,
            Action::Damage { amount: 25.0, target: ActionTarget::Target }
        );
        assert!(matches!(
            timeline.actions()[2].action,
            Action::Force { frame: ForceFrame::Caster, target: ActionTarget::Target, .. }
        ));
        assert!((timeline.cooldown() - 3.0).abs() < f32::EPSILON);
    }
}
