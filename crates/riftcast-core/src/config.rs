//! Simulation configuration.

use riftcast_motion::GroundProbeConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Fixed timestep: 60 Hz.
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Default gravity, in world units per second squared (negative is down).
pub const DEFAULT_GRAVITY: f32 = -9.81;

/// How a non-interruptible skill resists cancellation.
///
/// Caster death cancels a cast under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptPolicy {
    /// A non-interruptible cast refuses every other request. Its own
    /// movement and caster-state violations still cancel it.
    #[default]
    ExternalOnly,
    /// A non-interruptible cast ignores its own movement and caster-state
    /// violations. Strictly higher-priority requests still displace it.
    SelfViolations,
}

/// Parameters fixed for the lifetime of a simulation.
///
/// # Example
///
/// ```
/// use riftcast_core::config::{InterruptPolicy, SimulationConfig};
///
/// let config = SimulationConfig::from_json_str(r#"{ "gravity": -20.0, "interrupt_policy": "self_violations" }"#).unwrap();
/// assert!((config.gravity + 20.0).abs() < f32::EPSILON);
/// assert_eq!(config.interrupt_policy, InterruptPolicy::SelfViolations);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seconds per tick.
    pub dt: f32,
    /// Gravity applied to entities that do not override it.
    pub gravity: f32,
    /// Ground probe sphere placement.
    pub ground_probe: GroundProbeConfig,
    /// Non-interruptible cast semantics.
    pub interrupt_policy: InterruptPolicy,
}

impl SimulationConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Json`] or [`ConfigError::InvalidSimulation`].
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the interrupt policy (builder style).
    #[must_use]
    pub fn with_interrupt_policy(mut self, policy: InterruptPolicy) -> Self {
        self.interrupt_policy = policy;
        self
    }

    /// Sets the tick length (builder style).
    #[must_use]
    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSimulation`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::InvalidSimulation(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if !(self.gravity < 0.0 && self.gravity.is_finite()) {
            return Err(ConfigError::InvalidSimulation(format!(
                "gravity must be negative, got {}",
                self.gravity
            )));
        }
        if self.ground_probe.radius <= 0.0 {
            return Err(ConfigError::InvalidSimulation(format!(
                "ground probe radius must be positive, got {}",
                self.ground_probe.radius
            )));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: FIXED_DT,
            gravity: DEFAULT_GRAVITY,
            ground_probe: GroundProbeConfig::default(),
            interrupt_policy: InterruptPolicy::ExternalOnly,
        }
    }
}
