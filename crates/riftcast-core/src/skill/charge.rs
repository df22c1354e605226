//! Charge profiles.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, TimelineKind};

use super::timeline::ActionTimeline;
use super::SkillId;

fn default_true() -> bool {
    true
}

/// How long a skill must be held before it fires, and what happens meanwhile.
///
/// The times here are base values; the effective per-entity values come from
/// [`Formulas::required_charge_time`](crate::collab::Formulas::required_charge_time)
/// and [`Formulas::full_charge_time`](crate::collab::Formulas::full_charge_time).
///
/// With `auto_release` (the default) the cast begins as soon as the required
/// time is reached. Without it, charging continues until the host calls
/// [`Simulation::release_charge`](crate::simulation::Simulation::release_charge)
/// or the full charge time is reached, and the extra time feeds potency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeProfile {
    /// Minimum charge before the skill may fire.
    pub required_charge_time: f32,
    /// Charge at which potency stops growing.
    pub full_charge_time: f32,
    /// Any successful move cancels the charge.
    #[serde(default)]
    pub movement_cancels_charge: bool,
    /// Actions scheduled from the start of charging.
    #[serde(default)]
    pub pre_charge: ActionTimeline,
    /// Hint for the presentation layer to show a progress bar.
    #[serde(default)]
    pub show_progress: bool,
    /// Start casting at the required charge time without waiting for a
    /// release.
    #[serde(default = "default_true")]
    pub auto_release: bool,
}

impl ChargeProfile {
    /// A profile that fires as soon as `required` seconds have passed.
    #[must_use]
    pub fn new(required: f32, full: f32) -> Self {
        Self {
            required_charge_time: required,
            full_charge_time: full,
            movement_cancels_charge: false,
            pre_charge: ActionTimeline::new(),
            show_progress: false,
            auto_release: true,
        }
    }

    /// Sets whether movement cancels the charge (builder style).
    #[must_use]
    pub fn cancelled_by_movement(mut self, cancels: bool) -> Self {
        self.movement_cancels_charge = cancels;
        self
    }

    /// Sets the pre-charge timeline (builder style).
    #[must_use]
    pub fn with_pre_charge(mut self, timeline: ActionTimeline) -> Self {
        self.pre_charge = timeline;
        self
    }

    /// Requires an explicit release (builder style).
    #[must_use]
    pub fn held(mut self) -> Self {
        self.auto_release = false;
        self
    }

    /// Checks charge times and the pre-charge timeline.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NegativeChargeTime`], [`ConfigError::ChargeTimeOrder`]
    /// or any timeline error from the pre-charge actions.
    pub fn validate(&self, skill: &SkillId) -> ConfigResult<()> {
        if self.required_charge_time < 0.0 || self.full_charge_time < 0.0 {
            return Err(ConfigError::NegativeChargeTime(skill.clone()));
        }
        if self.full_charge_time < self.required_charge_time {
            return Err(ConfigError::ChargeTimeOrder {
                skill: skill.clone(),
                required: self.required_charge_time,
                full: self.full_charge_time,
            });
        }
        self.pre_charge.validate(skill, TimelineKind::PreCharge)
    }
}
