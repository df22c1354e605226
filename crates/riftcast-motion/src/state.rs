//! Per-entity motion state.
//!
//! [`MotionState`] is the physical side of an entity: velocity, gravity,
//! grounded status and bookkeeping that skill logic reads to decide whether a
//! cast is still valid (has the entity moved? is it airborne?).
//!
//! `grounded` is derived, not authoritative. It is recomputed by
//! [`MotionState::integrate`] every tick from the ground probe and vertical
//! velocity, with one exception: [`MotionState::jump`] clears it immediately so
//! a second jump in the same tick is refused.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ballistic::solve_launch;
use crate::error::Result;
use crate::ground::{GroundProbe, GroundProbeConfig};
use crate::rotation::{
    horizontal, look_rotation, remaining_horizontal_angle, rotate_towards, RotateToward,
    RotationProgress, ROTATION_THRESHOLD_DEGREES,
};
use crate::steering::Steering;
use crate::Transform;

bitflags::bitflags! {
    /// Motion capabilities that can be switched off independently.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MovementLocks: u8 {
        /// Input-driven movement is disabled.
        const MOVE = 1 << 0;
        /// Jumping is disabled.
        const JUMP = 1 << 1;
        /// Rotation (rate-limited and rotate-toward) is disabled.
        const ROTATE = 1 << 2;
    }
}

/// Parameters for one input-driven move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    /// Raw movement input.
    pub input: Vec3,
    /// How `input` maps to world space.
    pub steering: Steering,
    /// Base movement speed in units per second.
    pub speed: f32,
    /// Multiplier applied on top of `speed`.
    pub multiplier: f32,
    /// Turn the entity to face the (horizontal) movement direction.
    pub rotate_to_face: bool,
}

impl MoveRequest {
    /// A world-space move at `speed` with multiplier 1 that does not turn
    /// the entity.
    #[must_use]
    pub fn world(input: Vec3, speed: f32) -> Self {
        Self {
            input,
            steering: Steering::World,
            speed,
            multiplier: 1.0,
            rotate_to_face: false,
        }
    }

    /// Sets whether the entity turns to face its movement.
    #[must_use]
    pub fn facing(mut self, rotate_to_face: bool) -> Self {
        self.rotate_to_face = rotate_to_face;
        self
    }

    /// Sets the steering strategy.
    #[must_use]
    pub fn with_steering(mut self, steering: Steering) -> Self {
        self.steering = steering;
        self
    }

    /// Sets the speed multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f32) -> Self {
        self.multiplier = multiplier;
        self
    }
}

/// Physical motion state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    velocity: Vec3,
    gravity: f32,
    grounded: bool,
    last_moved_tick: Option<u64>,
    last_jumped_tick: Option<u64>,
    move_sequence: u64,
    locks: MovementLocks,
    rotation_task: Option<RotateToward>,
}

impl MotionState {
    /// Creates a resting, airborne motion state with signed `gravity`
    /// (negative pulls down).
    #[must_use]
    pub fn new(gravity: f32) -> Self {
        Self {
            velocity: Vec3::ZERO,
            gravity,
            grounded: false,
            last_moved_tick: None,
            last_jumped_tick: None,
            move_sequence: 0,
            locks: MovementLocks::empty(),
            rotation_task: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current velocity.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Overwrites the velocity.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    /// Signed gravitational acceleration.
    #[must_use]
    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    /// Whether the last ground evaluation found ground under the entity.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Tick of the last successful move.
    #[must_use]
    pub fn last_moved_tick(&self) -> Option<u64> {
        self.last_moved_tick
    }

    /// Tick of the last successful jump.
    #[must_use]
    pub fn last_jumped_tick(&self) -> Option<u64> {
        self.last_jumped_tick
    }

    /// Monotonic counter of successful moves.
    ///
    /// Skill logic captures this when a cast starts and compares later to
    /// detect movement regardless of tick ordering.
    #[must_use]
    pub fn move_sequence(&self) -> u64 {
        self.move_sequence
    }

    /// Returns true if the entity moved since `sequence` was captured.
    #[must_use]
    pub fn moved_since(&self, sequence: u64) -> bool {
        self.move_sequence != sequence
    }

    /// Currently active locks.
    #[must_use]
    pub fn locks(&self) -> MovementLocks {
        self.locks
    }

    /// Replaces the active locks.
    pub fn set_locks(&mut self, locks: MovementLocks) {
        self.locks = locks;
    }

    /// The in-flight rotate-toward sequence, if any.
    #[must_use]
    pub fn rotation_task(&self) -> Option<&RotateToward> {
        self.rotation_task.as_ref()
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Moves the transform by one tick of input-driven motion.
    ///
    /// Returns the displacement applied. A locked `MOVE` capability or a
    /// zero mapped direction produce `Vec3::ZERO` and are not recorded as a
    /// move.
    pub fn move_by(
        &mut self,
        transform: &mut Transform,
        request: &MoveRequest,
        dt: f32,
        tick: u64,
    ) -> Vec3 {
        if self.locks.contains(MovementLocks::MOVE) {
            return Vec3::ZERO;
        }
        let direction = request.steering.world_direction(request.input);
        let Some(direction) = direction.try_normalize() else {
            return Vec3::ZERO;
        };

        let displacement = direction * request.speed * request.multiplier * dt;
        transform.position += displacement;

        if request.rotate_to_face && !self.locks.contains(MovementLocks::ROTATE) {
            if let Some(facing) = look_rotation(horizontal(direction)) {
                transform.rotation = facing;
            }
        }

        self.last_moved_tick = Some(tick);
        self.move_sequence += 1;
        displacement
    }

    /// Jumps to reach `jump_height` above the current position.
    ///
    /// Only succeeds while grounded and with `JUMP` unlocked.
    pub fn jump(&mut self, jump_height: f32, tick: u64) -> bool {
        if !self.grounded || self.locks.contains(MovementLocks::JUMP) {
            return false;
        }
        self.velocity.y = (jump_height * -2.0 * self.gravity).max(0.0).sqrt();
        self.grounded = false;
        self.last_jumped_tick = Some(tick);
        true
    }

    /// Adds `force` to the velocity.
    pub fn apply_force(&mut self, force: Vec3) {
        self.velocity += force;
    }

    /// Launches the entity on a ballistic arc that lands on `target`.
    ///
    /// The transform is first yawed to face the target horizontally; the
    /// launch velocity is then expressed in that facing frame.
    ///
    /// # Errors
    ///
    /// Propagates [`MotionError`](crate::MotionError) from the solver. On
    /// error neither the transform nor the velocity change.
    pub fn launch(
        &mut self,
        transform: &mut Transform,
        target: Vec3,
        angle_degrees: f32,
    ) -> Result<Vec3> {
        let solution = solve_launch(transform.position, target, angle_degrees, self.gravity)?;
        if let Some(facing) = look_rotation(solution.heading) {
            transform.rotation = facing;
        }
        self.velocity = transform.rotation * solution.local_velocity();
        self.grounded = false;
        Ok(self.velocity)
    }

    // =========================================================================
    // Rotation
    // =========================================================================

    /// Turns toward `target` by at most `speed_degrees * dt` degrees.
    ///
    /// Returns false if rotation is locked or the target has no horizontal
    /// offset.
    pub fn rotate_toward_position(
        &self,
        transform: &mut Transform,
        target: Vec3,
        speed_degrees: f32,
        dt: f32,
    ) -> bool {
        if self.locks.contains(MovementLocks::ROTATE) {
            return false;
        }
        let Some(goal) = look_rotation(horizontal(target - transform.position)) else {
            return false;
        };
        transform.rotation =
            rotate_towards(transform.rotation, goal, (speed_degrees * dt).to_radians());
        true
    }

    /// Starts a rotate-toward sequence, replacing any in-flight one.
    pub fn start_rotate_toward(&mut self, target: Vec3, multiplier: f32, tick: u64) {
        let previous = self.rotation_task.replace(RotateToward {
            target,
            multiplier,
            started_tick: tick,
        });
        if let Some(previous) = previous {
            tracing::debug!(
                previous_target = %previous.target,
                target = %target,
                tick,
                "rotate-toward restarted"
            );
        }
    }

    /// Stops the in-flight rotate-toward sequence. Returns whether one was
    /// running.
    pub fn cancel_rotate_toward(&mut self) -> bool {
        self.rotation_task.take().is_some()
    }

    /// Advances the rotate-toward sequence by one tick.
    ///
    /// The sequence ends once the remaining horizontal angle is at or below
    /// [`ROTATION_THRESHOLD_DEGREES`], or if its target becomes directly
    /// above or below the entity.
    pub fn advance_rotation(
        &mut self,
        transform: &mut Transform,
        rotate_speed_degrees: f32,
        dt: f32,
    ) -> RotationProgress {
        let Some(task) = self.rotation_task else {
            return RotationProgress::Idle;
        };
        if self.locks.contains(MovementLocks::ROTATE) {
            return remaining_horizontal_angle(transform.rotation, transform.position, task.target)
                .map_or(RotationProgress::Idle, RotationProgress::Turning);
        }

        let finished = |remaining: Option<f32>| {
            remaining.map_or(true, |angle| angle <= ROTATION_THRESHOLD_DEGREES)
        };

        let before =
            remaining_horizontal_angle(transform.rotation, transform.position, task.target);
        if finished(before) {
            self.rotation_task = None;
            return RotationProgress::Finished;
        }

        self.rotate_toward_position(
            transform,
            task.target,
            rotate_speed_degrees * task.multiplier,
            dt,
        );

        let after =
            remaining_horizontal_angle(transform.rotation, transform.position, task.target);
        match after {
            Some(angle) if angle > ROTATION_THRESHOLD_DEGREES => RotationProgress::Turning(angle),
            _ => {
                self.rotation_task = None;
                RotationProgress::Finished
            }
        }
    }

    // =========================================================================
    // Integration
    // =========================================================================

    /// Re-evaluates grounding at the current position without moving.
    ///
    /// Grounded only while not ascending and the probe touches ground; a
    /// descending velocity is clamped to zero on contact. Returns the new
    /// grounded flag.
    pub fn settle(
        &mut self,
        transform: &Transform,
        probe: &dyn GroundProbe,
        config: &GroundProbeConfig,
    ) -> bool {
        let touching = self.velocity.y <= 0.0
            && probe.overlaps_ground(config.center(transform.position), config.radius);
        if touching && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }
        self.grounded = touching;
        touching
    }

    /// Advances physics by `dt`.
    ///
    /// 1. Probes for ground (only while not ascending) and clamps a
    ///    descending velocity to zero on contact.
    /// 2. Accumulates gravity while airborne.
    /// 3. Moves the transform when velocity is non-zero.
    pub fn integrate(
        &mut self,
        transform: &mut Transform,
        probe: &dyn GroundProbe,
        config: &GroundProbeConfig,
        dt: f32,
    ) {
        self.settle(transform, probe, config);

        if !self.grounded {
            self.velocity.y += self.gravity * dt;
        }

        if self.velocity != Vec3::ZERO {
            transform.position += self.velocity * dt;
        }
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::new(-9.81)
    }
}
