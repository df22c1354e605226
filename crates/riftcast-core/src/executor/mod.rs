//! Per-entity skill execution.
//!
//! A [`SkillExecutor`] owns one entity's cast state: the active cast (if
//! any), per-skill cooldowns and the selected external target. It moves a
//! cast through its phases:
//!
//! ```text
//!            request (charged)          required time reached
//!   Idle ───────────────────▶ Charging ─────────────────────▶ Casting
//!    ▲  ╲                        │                              │
//!    │   ╲ request (no charge)   │ cancelled                    │ completed / interrupted
//!    │    ╲─────────────────────────────────────────────────────▶
//!    └───────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Executors never touch the arena. They read a [`WorldView`] and write
//! [`Output`](crate::output::Output)s into an [`OutputBuffer`]; the
//! simulation's resolvers apply them.

pub mod targeting;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::collab::Collaborators;
use crate::config::InterruptPolicy;
use crate::entity::{Entity, EntityId, ResourceKind};
use crate::error::{CastRefusal, CastResult};
use crate::output::{CancelReason, Command, Event, Modifier, OutputBuffer, OutputEnvelope, TraceId};
use crate::skill::{Action, ActionTarget, ForceFrame, SkillDefinition, SkillId};
use crate::world_view::WorldView;

pub use targeting::{recheck_target, resolve_target};

/// Slack when comparing accumulated tick time against offsets.
const TIME_EPSILON: f32 = 1e-5;

// =============================================================================
// Phases and Tickets
// =============================================================================

/// Where an executor is in the cast lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillPhase {
    /// No active cast.
    Idle,
    /// Accumulating charge time.
    Charging,
    /// Running the main timeline.
    Casting,
}

impl fmt::Display for SkillPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Charging => write!(f, "charging"),
            Self::Casting => write!(f, "casting"),
        }
    }
}

/// Receipt for an accepted cast request.
#[derive(Debug, Clone, PartialEq)]
pub struct CastTicket {
    /// Accepted skill.
    pub skill: SkillId,
    /// Trace shared by every output of this cast.
    pub trace_id: TraceId,
    /// Resolved target.
    pub target: Option<EntityId>,
    /// Phase the cast entered.
    pub phase: SkillPhase,
}

/// Everything an executor reads during one tick.
#[derive(Debug, Clone, Copy)]
pub struct ExecContext<'a> {
    /// Snapshot of the arena.
    pub view: WorldView<'a>,
    /// External collaborators.
    pub collab: &'a Collaborators,
    /// Non-interruptible semantics.
    pub policy: InterruptPolicy,
    /// Seconds per tick.
    pub dt: f32,
}

// =============================================================================
// Active Cast
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum CastStage {
    Charging {
        elapsed: f32,
        next_pre_charge: usize,
        release_requested: bool,
    },
    Casting {
        elapsed: f32,
        next_action: usize,
    },
}

/// The cast an executor is running.
#[derive(Debug, Clone)]
pub struct ActiveCast {
    skill: Arc<SkillDefinition>,
    target: Option<EntityId>,
    trace_id: TraceId,
    stage: CastStage,
    move_sequence: u64,
    cooldown_armed: bool,
    potency: f32,
}

impl ActiveCast {
    /// The skill being cast.
    #[must_use]
    pub fn skill(&self) -> &Arc<SkillDefinition> {
        &self.skill
    }

    /// Resolved target.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Trace ID of this cast.
    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SkillPhase {
        match self.stage {
            CastStage::Charging { .. } => SkillPhase::Charging,
            CastStage::Casting { .. } => SkillPhase::Casting,
        }
    }

    /// Seconds spent in the current phase.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        match self.stage {
            CastStage::Charging { elapsed, .. } | CastStage::Casting { elapsed, .. } => elapsed,
        }
    }

    /// Charge potency. 1 until casting begins.
    #[must_use]
    pub const fn potency(&self) -> f32 {
        self.potency
    }

    /// Whether this cast has armed its cooldown.
    #[must_use]
    pub const fn cooldown_armed(&self) -> bool {
        self.cooldown_armed
    }

    fn cancel_event(&self, caster: EntityId, reason: CancelReason) -> Event {
        let skill = self.skill.id.clone();
        match self.stage {
            CastStage::Charging { .. } => Event::ChargeCancelled { caster, skill, reason },
            CastStage::Casting { .. } => Event::CastInterrupted { caster, skill, reason },
        }
    }

    fn resolve_role(&self, role: ActionTarget, caster: EntityId) -> Option<EntityId> {
        match role {
            ActionTarget::Caster => Some(caster),
            ActionTarget::Target => self.target,
        }
    }
}

/// Outcome of advancing a cast by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Ended,
}

/// Resources spent by this executor whose outputs have not resolved yet.
#[derive(Debug, Clone, Default, PartialEq)]
struct SpendLedger(BTreeMap<ResourceKind, f32>);

impl SpendLedger {
    fn available(&self, caster: &Entity, kind: ResourceKind) -> f32 {
        caster.combat.available(kind) - self.0.get(&kind).copied().unwrap_or(0.0)
    }

    fn can_afford(&self, caster: &Entity, kind: ResourceKind, amount: f32) -> bool {
        self.available(caster, kind) >= amount
    }

    fn record(&mut self, kind: ResourceKind, amount: f32) {
        *self.0.entry(kind).or_insert(0.0) += amount;
    }
}

// =============================================================================
// Skill Executor
// =============================================================================

/// One entity's cast state.
#[derive(Debug, Clone)]
pub struct SkillExecutor {
    caster: EntityId,
    active: Option<ActiveCast>,
    cooldowns: BTreeMap<SkillId, f32>,
    selected_target: Option<EntityId>,
    pending_spend: SpendLedger,
}

impl SkillExecutor {
    /// Creates an idle executor for `caster`.
    #[must_use]
    pub fn new(caster: EntityId) -> Self {
        Self {
            caster,
            active: None,
            cooldowns: BTreeMap::new(),
            selected_target: None,
            pending_spend: SpendLedger::default(),
        }
    }

    /// The entity this executor belongs to.
    #[must_use]
    pub const fn caster(&self) -> EntityId {
        self.caster
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SkillPhase {
        self.active.as_ref().map_or(SkillPhase::Idle, ActiveCast::phase)
    }

    /// The active cast, if any.
    #[must_use]
    pub fn active(&self) -> Option<&ActiveCast> {
        self.active.as_ref()
    }

    /// ID of the active skill, if any.
    #[must_use]
    pub fn active_skill(&self) -> Option<&SkillId> {
        self.active.as_ref().map(|cast| &cast.skill.id)
    }

    /// Seconds until `skill` is off cooldown, 0 if ready.
    #[must_use]
    pub fn cooldown_remaining(&self, skill: &SkillId) -> f32 {
        self.cooldowns.get(skill).copied().unwrap_or(0.0)
    }

    /// Skills currently cooling down, in ID order.
    pub fn cooldowns(&self) -> impl Iterator<Item = (&SkillId, f32)> {
        self.cooldowns.iter().map(|(id, remaining)| (id, *remaining))
    }

    /// The selected external target.
    #[must_use]
    pub const fn selected_target(&self) -> Option<EntityId> {
        self.selected_target
    }

    /// Sets the external target used when a request names none.
    pub fn select_target(&mut self, target: Option<EntityId>) {
        self.selected_target = target;
    }

    /// Charge progress toward the full charge time, in `[0, 1]`.
    ///
    /// `None` unless charging.
    #[must_use]
    pub fn charge_fraction(&self, caster: &Entity, collab: &Collaborators) -> Option<f32> {
        let cast = self.active.as_ref()?;
        let CastStage::Charging { elapsed, .. } = cast.stage else {
            return None;
        };
        let profile = cast.skill.charge.as_ref()?;
        let full = collab.formulas.full_charge_time(caster, profile);
        if full <= 0.0 {
            return Some(1.0);
        }
        Some((elapsed / full).clamp(0.0, 1.0))
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Checks whether `skill` may start now and resolves its target.
    ///
    /// Performs the cooldown, preemption, caster-state, status-effect,
    /// targeting and affordability checks in that order. Does not change
    /// any state.
    ///
    /// # Errors
    ///
    /// The first failed check as a [`CastRefusal`].
    pub fn validate_request(
        &self,
        skill: &SkillDefinition,
        selected: Option<EntityId>,
        ctx: &ExecContext<'_>,
    ) -> CastResult<Option<EntityId>> {
        let caster = ctx
            .view
            .get_entity(self.caster)
            .ok_or(CastRefusal::UnknownCaster(self.caster))?;
        if !skill.is_active() {
            return Err(CastRefusal::PassiveSkill(skill.id.clone()));
        }
        if !caster.is_alive() {
            return Err(CastRefusal::CasterDead);
        }

        let remaining = self.cooldown_remaining(&skill.id);
        if remaining > 0.0 {
            return Err(CastRefusal::OnCooldown {
                skill: skill.id.clone(),
                remaining,
            });
        }

        if let Some(active) = &self.active {
            if active.skill.priority >= skill.priority {
                return Err(CastRefusal::Blocked {
                    active: active.skill.id.clone(),
                    active_priority: active.skill.priority,
                    requested_priority: skill.priority,
                });
            }
            if ctx.policy == InterruptPolicy::ExternalOnly && !active.skill.interruptible {
                return Err(CastRefusal::Uninterruptible {
                    active: active.skill.id.clone(),
                });
            }
        }

        if !skill.caster_state.accepts(caster.motion.is_grounded()) {
            return Err(CastRefusal::CasterStateMismatch {
                required: skill.caster_state,
            });
        }

        let status = &ctx.collab.status;
        for requirement in &skill.required_effects {
            if !status.has_effect(self.caster, &requirement.effect, requirement.min_stacks) {
                return Err(CastRefusal::MissingStatusEffect {
                    effect: requirement.effect.clone(),
                    min_stacks: requirement.min_stacks,
                });
            }
        }
        for group in &skill.required_groups {
            if !status.has_group(self.caster, group) {
                return Err(CastRefusal::MissingStatusGroup(group.clone()));
            }
        }

        let target = resolve_target(
            skill,
            caster,
            selected.or(self.selected_target),
            &ctx.view,
            ctx.collab.line_of_sight.as_ref(),
        )?;

        let mut requirements = skill.timeline.required_resources();
        if let Some(charge) = &skill.charge {
            for (resource, amount) in charge.pre_charge.required_resources() {
                *requirements.entry(resource).or_insert(0.0) += amount;
            }
        }
        for (resource, required) in requirements {
            let available = self.pending_spend.available(caster, resource);
            if available < required {
                return Err(CastRefusal::InsufficientResource {
                    resource,
                    required,
                    available,
                });
            }
        }

        Ok(target)
    }

    /// Starts an already validated cast.
    ///
    /// Any active cast is interrupted with [`CancelReason::Preempted`].
    /// Charging skills fire their offset-zero pre-charge actions; other
    /// skills enter casting and fire their offset-zero actions.
    pub fn begin(
        &mut self,
        skill: Arc<SkillDefinition>,
        target: Option<EntityId>,
        trace_id: TraceId,
        ctx: &ExecContext<'_>,
        out: &mut OutputBuffer,
    ) -> CastTicket {
        if let Some(previous) = self.active.take() {
            warn!(
                caster = %self.caster,
                skill = %previous.skill.id,
                by = %skill.id,
                "cast preempted"
            );
            out.emit(
                previous.trace_id,
                previous.cancel_event(
                    self.caster,
                    CancelReason::Preempted { by: skill.id.clone() },
                ),
            );
        }

        let mut cast = ActiveCast {
            skill: Arc::clone(&skill),
            target,
            trace_id,
            stage: CastStage::Charging {
                elapsed: 0.0,
                next_pre_charge: 0,
                release_requested: false,
            },
            move_sequence: 0,
            cooldown_armed: false,
            potency: 1.0,
        };

        let Some(caster) = ctx.view.get_entity(self.caster) else {
            return CastTicket {
                skill: skill.id.clone(),
                trace_id,
                target,
                phase: SkillPhase::Idle,
            };
        };
        cast.move_sequence = caster.motion.move_sequence();

        let mut ledger = std::mem::take(&mut self.pending_spend);
        let flow = if skill.charge.is_some() {
            debug!(caster = %self.caster, skill = %skill.id, "charge started");
            out.emit(
                trace_id,
                Event::ChargeStarted {
                    caster: self.caster,
                    skill: skill.id.clone(),
                    target,
                },
            );
            self.fire_pre_charge(&mut cast, 0.0, caster, ctx, &mut ledger, out)
        } else {
            self.start_casting(&mut cast, 1.0, caster, ctx, &mut ledger, out)
        };
        self.pending_spend = ledger;

        let phase = if flow == Flow::Continue {
            let phase = cast.phase();
            self.active = Some(cast);
            phase
        } else {
            SkillPhase::Idle
        };
        CastTicket {
            skill: skill.id.clone(),
            trace_id,
            target,
            phase,
        }
    }

    /// Cancels the active cast. Returns whether one was running.
    pub fn cancel(&mut self, reason: CancelReason, out: &mut OutputBuffer) -> bool {
        let Some(cast) = self.active.take() else {
            return false;
        };
        debug!(caster = %self.caster, skill = %cast.skill.id, %reason, "cast cancelled");
        out.emit(cast.trace_id, cast.cancel_event(self.caster, reason));
        true
    }

    /// Ends a held charge at the next tick that satisfies the required
    /// charge time. Returns false unless charging.
    pub fn release(&mut self) -> bool {
        match self.active.as_mut().map(|cast| &mut cast.stage) {
            Some(CastStage::Charging {
                release_requested, ..
            }) => {
                *release_requested = true;
                true
            }
            _ => false,
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advances cooldowns and the active cast by one tick.
    pub fn tick(&mut self, ctx: &ExecContext<'_>) -> Vec<OutputEnvelope> {
        let mut out = OutputBuffer::new(self.caster, ctx.view.tick());
        let mut ledger = std::mem::take(&mut self.pending_spend);

        self.cooldowns.retain(|_, remaining| {
            *remaining -= ctx.dt;
            *remaining > TIME_EPSILON
        });

        if let Some(mut cast) = self.active.take() {
            let flow = match ctx.view.get_entity(self.caster) {
                Some(caster) => self.advance(&mut cast, caster, ctx, &mut ledger, &mut out),
                None => {
                    out.emit(
                        cast.trace_id,
                        cast.cancel_event(self.caster, CancelReason::CasterDied),
                    );
                    Flow::Ended
                }
            };
            if flow == Flow::Continue {
                self.active = Some(cast);
            }
        }

        out.into_envelopes()
    }

    fn advance(
        &mut self,
        cast: &mut ActiveCast,
        caster: &Entity,
        ctx: &ExecContext<'_>,
        ledger: &mut SpendLedger,
        out: &mut OutputBuffer,
    ) -> Flow {
        if let Err(reason) = self.check_violations(cast, caster, ctx, ledger) {
            debug!(caster = %self.caster, skill = %cast.skill.id, %reason, "cast cancelled");
            out.emit(cast.trace_id, cast.cancel_event(self.caster, reason));
            return Flow::Ended;
        }

        match cast.stage {
            CastStage::Charging {
                elapsed,
                next_pre_charge,
                release_requested,
            } => {
                let elapsed = elapsed + ctx.dt;
                cast.stage = CastStage::Charging {
                    elapsed,
                    next_pre_charge,
                    release_requested,
                };
                if self.fire_pre_charge(cast, elapsed, caster, ctx, ledger, out) == Flow::Ended {
                    return Flow::Ended;
                }
                self.try_release(cast, caster, ctx, ledger, out)
            }
            CastStage::Casting {
                elapsed,
                next_action,
            } => {
                let elapsed = elapsed + ctx.dt;
                cast.stage = CastStage::Casting {
                    elapsed,
                    next_action,
                };
                if self.fire_main(cast, elapsed, caster, ctx, ledger, out) == Flow::Ended {
                    return Flow::Ended;
                }
                self.try_complete(cast, out)
            }
        }
    }

    /// Checks the per-tick cancellation conditions of the current stage.
    fn check_violations(
        &self,
        cast: &ActiveCast,
        caster: &Entity,
        ctx: &ExecContext<'_>,
        ledger: &SpendLedger,
    ) -> Result<(), CancelReason> {
        if !caster.is_alive() {
            return Err(CancelReason::CasterDied);
        }
        let skill = &cast.skill;
        let tolerant = ctx.policy == InterruptPolicy::SelfViolations && !skill.interruptible;

        let movement_cancels = match cast.stage {
            CastStage::Charging { .. } => skill
                .charge
                .as_ref()
                .is_some_and(|profile| profile.movement_cancels_charge),
            CastStage::Casting { .. } => skill.movement_cancels_skill,
        };
        if !tolerant && movement_cancels && caster.motion.moved_since(cast.move_sequence) {
            return Err(CancelReason::Moved);
        }
        if !tolerant && !skill.caster_state.accepts(caster.motion.is_grounded()) {
            return Err(CancelReason::CasterState);
        }

        match cast.stage {
            CastStage::Charging { .. } => recheck_target(
                skill,
                caster,
                cast.target,
                &ctx.view,
                ctx.collab.line_of_sight.as_ref(),
            )
            .map_err(CancelReason::TargetInvalid),
            CastStage::Casting { next_action, .. } => {
                let unaffordable = skill
                    .timeline
                    .remaining_required_resources(next_action)
                    .into_iter()
                    .any(|(kind, amount)| !ledger.can_afford(caster, kind, amount));
                if unaffordable {
                    Err(CancelReason::ResourcesDepleted)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Moves a charge into casting once its release conditions hold.
    fn try_release(
        &mut self,
        cast: &mut ActiveCast,
        caster: &Entity,
        ctx: &ExecContext<'_>,
        ledger: &mut SpendLedger,
        out: &mut OutputBuffer,
    ) -> Flow {
        let CastStage::Charging {
            elapsed,
            release_requested,
            ..
        } = cast.stage
        else {
            return Flow::Continue;
        };
        let skill = Arc::clone(&cast.skill);
        let Some(profile) = skill.charge.as_ref() else {
            return self.start_casting(cast, 1.0, caster, ctx, ledger, out);
        };

        let formulas = &ctx.collab.formulas;
        let required = formulas.required_charge_time(caster, profile);
        let full = formulas.full_charge_time(caster, profile);
        let charged = elapsed + TIME_EPSILON >= required;
        let released = profile.auto_release || release_requested || elapsed + TIME_EPSILON >= full;
        if !(charged && released) {
            return Flow::Continue;
        }

        if self.fire_pre_charge(cast, f32::INFINITY, caster, ctx, ledger, out) == Flow::Ended {
            return Flow::Ended;
        }
        let potency = formulas.charge_potency(caster, profile, elapsed);
        self.start_casting(cast, potency, caster, ctx, ledger, out)
    }

    fn start_casting(
        &mut self,
        cast: &mut ActiveCast,
        potency: f32,
        caster: &Entity,
        ctx: &ExecContext<'_>,
        ledger: &mut SpendLedger,
        out: &mut OutputBuffer,
    ) -> Flow {
        cast.stage = CastStage::Casting {
            elapsed: 0.0,
            next_action: 0,
        };
        cast.potency = potency;
        cast.move_sequence = caster.motion.move_sequence();

        debug!(caster = %self.caster, skill = %cast.skill.id, potency, "cast started");
        out.emit(
            cast.trace_id,
            Event::CastStarted {
                caster: self.caster,
                skill: cast.skill.id.clone(),
                target: cast.target,
                potency,
            },
        );
        self.fire_main(cast, 0.0, caster, ctx, ledger, out)
    }

    fn try_complete(&self, cast: &ActiveCast, out: &mut OutputBuffer) -> Flow {
        let CastStage::Casting {
            elapsed,
            next_action,
        } = cast.stage
        else {
            return Flow::Continue;
        };
        let timeline = &cast.skill.timeline;
        if next_action < timeline.len() || elapsed + TIME_EPSILON < timeline.duration() {
            return Flow::Continue;
        }
        debug!(caster = %self.caster, skill = %cast.skill.id, "cast completed");
        out.emit(
            cast.trace_id,
            Event::CastCompleted {
                caster: self.caster,
                skill: cast.skill.id.clone(),
            },
        );
        Flow::Ended
    }

    // =========================================================================
    // Action Firing
    // =========================================================================

    /// Fires pre-charge actions due at `elapsed`.
    fn fire_pre_charge(
        &mut self,
        cast: &mut ActiveCast,
        elapsed: f32,
        caster: &Entity,
        ctx: &ExecContext<'_>,
        ledger: &mut SpendLedger,
        out: &mut OutputBuffer,
    ) -> Flow {
        let skill = Arc::clone(&cast.skill);
        let Some(profile) = skill.charge.as_ref() else {
            return Flow::Continue;
        };
        let actions = profile.pre_charge.actions();
        loop {
            let CastStage::Charging {
                next_pre_charge, ..
            } = &mut cast.stage
            else {
                return Flow::Continue;
            };
            let index = *next_pre_charge;
            let Some(timed) = actions.get(index) else {
                return Flow::Continue;
            };
            if timed.offset > elapsed + TIME_EPSILON {
                return Flow::Continue;
            }
            *next_pre_charge += 1;
            if !self.fire_action(cast, &timed.action, index, true, caster, ctx, ledger, out) {
                out.emit(
                    cast.trace_id,
                    cast.cancel_event(self.caster, CancelReason::ResourcesDepleted),
                );
                return Flow::Ended;
            }
        }
    }

    /// Fires main-timeline actions due at `elapsed`.
    fn fire_main(
        &mut self,
        cast: &mut ActiveCast,
        elapsed: f32,
        caster: &Entity,
        ctx: &ExecContext<'_>,
        ledger: &mut SpendLedger,
        out: &mut OutputBuffer,
    ) -> Flow {
        let skill = Arc::clone(&cast.skill);
        let actions = skill.timeline.actions();
        loop {
            let CastStage::Casting { next_action, .. } = &mut cast.stage else {
                return Flow::Continue;
            };
            let index = *next_action;
            let Some(timed) = actions.get(index) else {
                return Flow::Continue;
            };
            if timed.offset > elapsed + TIME_EPSILON {
                return Flow::Continue;
            }
            *next_action += 1;
            if !self.fire_action(cast, &timed.action, index, false, caster, ctx, ledger, out) {
                out.emit(
                    cast.trace_id,
                    cast.cancel_event(self.caster, CancelReason::ResourcesDepleted),
                );
                return Flow::Ended;
            }
        }
    }

    /// Emits the outputs of one action. Returns false if a required cost
    /// could not be paid.
    #[allow(clippy::too_many_arguments)]
    fn fire_action(
        &mut self,
        cast: &mut ActiveCast,
        action: &Action,
        index: usize,
        pre_charge: bool,
        caster: &Entity,
        ctx: &ExecContext<'_>,
        ledger: &mut SpendLedger,
        out: &mut OutputBuffer,
    ) -> bool {
        let caster_id = self.caster;
        let trace = cast.trace_id;
        let skill_id = &cast.skill.id;

        let fired = match action {
            Action::CollectCost {
                resource,
                amount,
                optional,
            } => {
                if ledger.can_afford(caster, *resource, *amount) {
                    ledger.record(*resource, *amount);
                    out.emit(
                        trace,
                        Modifier::CollectCost {
                            target: caster_id,
                            resource: *resource,
                            amount: *amount,
                        },
                    );
                    true
                } else if *optional {
                    debug!(caster = %caster_id, skill = %skill_id, %resource, "optional cost skipped");
                    false
                } else {
                    debug!(caster = %caster_id, skill = %skill_id, %resource, "required cost unaffordable");
                    return false;
                }
            }
            Action::ApplyCooldown { seconds } => {
                if cast.cooldown_armed {
                    false
                } else {
                    cast.cooldown_armed = true;
                    self.cooldowns.insert(skill_id.clone(), *seconds);
                    out.emit(
                        trace,
                        Event::CooldownArmed {
                            caster: caster_id,
                            skill: skill_id.clone(),
                            seconds: *seconds,
                        },
                    );
                    true
                }
            }
            Action::Damage { amount, target } => match cast.resolve_role(*target, caster_id) {
                Some(target) => {
                    out.emit(
                        trace,
                        Modifier::ApplyDamage {
                            source: caster_id,
                            target,
                            amount: amount * cast.potency,
                        },
                    );
                    true
                }
                None => unresolved(caster_id, skill_id, action),
            },
            Action::Heal { amount, target } => match cast.resolve_role(*target, caster_id) {
                Some(target) => {
                    out.emit(
                        trace,
                        Modifier::ApplyHealing {
                            source: caster_id,
                            target,
                            amount: amount * cast.potency,
                        },
                    );
                    true
                }
                None => unresolved(caster_id, skill_id, action),
            },
            Action::Force {
                force,
                target,
                frame,
            } => match cast.resolve_role(*target, caster_id) {
                Some(target) => {
                    let force = match frame {
                        ForceFrame::World => *force,
                        ForceFrame::Caster => caster.transform.rotation * *force,
                    };
                    out.emit(trace, Command::ApplyForce { target, force });
                    true
                }
                None => unresolved(caster_id, skill_id, action),
            },
            Action::Launch {
                target,
                angle_degrees,
            } => match cast
                .resolve_role(*target, caster_id)
                .and_then(|id| ctx.view.position(id))
            {
                Some(destination) => {
                    out.emit(
                        trace,
                        Command::Launch {
                            target: caster_id,
                            destination,
                            angle_degrees: *angle_degrees,
                        },
                    );
                    true
                }
                None => unresolved(caster_id, skill_id, action),
            },
            Action::Cue { name } => {
                out.emit(
                    trace,
                    Event::CueTriggered {
                        caster: caster_id,
                        skill: skill_id.clone(),
                        name: name.clone(),
                    },
                );
                true
            }
        };

        if fired {
            debug!(caster = %caster_id, skill = %skill_id, index, action = action.name(), "action fired");
            out.emit(
                trace,
                Event::ActionFired {
                    caster: caster_id,
                    skill: skill_id.clone(),
                    index,
                    pre_charge,
                },
            );
        }
        true
    }
}

fn unresolved(caster: EntityId, skill: &SkillId, action: &Action) -> bool {
    warn!(%caster, %skill, action = action.name(), "action target unresolved, skipped");
    false
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::entity::{CombatState, EntityInit, EntityTag, TeamId};
    use crate::output::Output;
    use crate::skill::{ActionTimeline, ChargeProfile, TargetPreference, Targeting};
    use glam::Vec3;

    const DT: f32 = 0.1;

    struct Bench {
        arena: Arena,
        collab: Collaborators,
        policy: InterruptPolicy,
        caster: EntityId,
        enemy: EntityId,
        executor: SkillExecutor,
        next_trace: u64,
    }

    impl Bench {
        fn new() -> Self {
            let mut arena = Arena::new();
            let combat = CombatState::new(100.0, TeamId::new(1)).with_pool(ResourceKind::Mana, 50.0);
            let caster = arena.spawn(EntityTag::Character, EntityInit::default().with_combat(combat), -9.81);
            let enemy = arena.spawn(
                EntityTag::Character,
                EntityInit::at_position(Vec3::new(0.0, 0.0, 3.0)).on_team(TeamId::new(2)),
                -9.81,
            );
            Self {
                arena,
                collab: Collaborators::default(),
                policy: InterruptPolicy::ExternalOnly,
                caster,
                enemy,
                executor: SkillExecutor::new(caster),
                next_trace: 0,
            }
        }

        fn request(&mut self, skill: SkillDefinition, selected: Option<EntityId>) -> (CastResult<CastTicket>, Vec<OutputEnvelope>) {
            let skill = Arc::new(skill);
            let trace = TraceId::new(self.next_trace);
            self.next_trace += 1;
            let ctx = ExecContext {
                view: WorldView::new(&self.arena, self.arena.current_tick()),
                collab: &self.collab,
                policy: self.policy,
                dt: DT,
            };
            let mut out = OutputBuffer::new(self.caster, 0);
            let result = self
                .executor
                .validate_request(&skill, selected, &ctx)
                .map(|target| self.executor.begin(Arc::clone(&skill), target, trace, &ctx, &mut out));
            (result, out.into_envelopes())
        }

        fn tick(&mut self) -> Vec<OutputEnvelope> {
            let ctx = ExecContext {
                view: WorldView::new(&self.arena, self.arena.current_tick()),
                collab: &self.collab,
                policy: self.policy,
                dt: DT,
            };
            let out = self.executor.tick(&ctx);
            self.arena.advance_tick();
            out
        }
    }

    fn events(envelopes: &[OutputEnvelope]) -> Vec<&Event> {
        envelopes.iter().filter_map(OutputEnvelope::event).collect()
    }

    fn has_event(envelopes: &[OutputEnvelope], pred: impl Fn(&Event) -> bool) -> bool {
        events(envelopes).into_iter().any(pred)
    }

    fn strike() -> SkillDefinition {
        SkillDefinition::new("strike").with_timeline(
            ActionTimeline::new()
                .then(0.0, Action::CollectCost { resource: ResourceKind::Mana, amount: 10.0, optional: false })
                .then(0.0, Action::ApplyCooldown { seconds: 1.0 })
                .then(0.2, Action::Damage { amount: 20.0, target: ActionTarget::Caster }),
        )
    }

    mod request_tests {
        use super::*;

        #[test]
        fn uncharged_request_starts_casting_and_fires_immediate_actions() {
            let mut bench = Bench::new();
            let (ticket, out) = bench.request(strike(), None);
            let ticket = ticket.unwrap();
            assert_eq!(ticket.phase, SkillPhase::Casting);
            assert_eq!(bench.executor.phase(), SkillPhase::Casting);
            assert!(has_event(&out, |e| matches!(e, Event::CastStarted { .. })));
            assert!(out.iter().any(|e| matches!(e.output(), Output::Modifier(Modifier::CollectCost { .. }))));
            assert!((bench.executor.cooldown_remaining(&SkillId::new("strike")) - 1.0).abs() < 1e-6);
        }

        #[test]
        fn cooldown_refuses() {
            let mut bench = Bench::new();
            let _ = bench.request(strike(), None);
            bench.executor.cancel(CancelReason::Manual, &mut OutputBuffer::new(bench.caster, 0));
            let (result, out) = bench.request(strike(), None);
            assert!(matches!(result, Err(CastRefusal::OnCooldown { .. })));
            assert!(out.is_empty());
        }

        #[test]
        fn refusal_leaves_no_state() {
            let mut bench = Bench::new();
            let skill = SkillDefinition::new("bolt")
                .with_targeting(Targeting::targeted(TargetPreference::Enemy, 1.0));
            let (result, out) = bench.request(skill, Some(bench.enemy));
            assert!(matches!(result, Err(CastRefusal::OutOfRange { .. })));
            assert!(out.is_empty());
            assert_eq!(bench.executor.phase(), SkillPhase::Idle);
        }

        #[test]
        fn selected_target_used_when_request_names_none() {
            let mut bench = Bench::new();
            bench.executor.select_target(Some(bench.enemy));
            let skill = SkillDefinition::new("bolt")
                .with_targeting(Targeting::targeted(TargetPreference::Enemy, 10.0));
            let (result, _) = bench.request(skill, None);
            assert_eq!(result.unwrap().target, Some(bench.enemy));
        }

        #[test]
        fn insufficient_resource_refused() {
            let mut bench = Bench::new();
            let skill = SkillDefinition::new("nuke").with_timeline(ActionTimeline::new().then(
                0.5,
                Action::CollectCost { resource: ResourceKind::Mana, amount: 80.0, optional: false },
            ));
            let (result, _) = bench.request(skill, None);
            assert!(matches!(
                result,
                Err(CastRefusal::InsufficientResource { resource: ResourceKind::Mana, .. })
            ));
        }

        #[test]
        fn pending_spend_counts_against_next_request() {
            let mut bench = Bench::new();
            let costly = |id: &str, priority| {
                SkillDefinition::new(id).with_priority(priority).with_timeline(ActionTimeline::new().then(
                    0.0,
                    Action::CollectCost { resource: ResourceKind::Mana, amount: 30.0, optional: false },
                ))
            };
            assert!(bench.request(costly("a", 0), None).0.is_ok());
            let (result, _) = bench.request(costly("b", 1), None);
            assert!(matches!(result, Err(CastRefusal::InsufficientResource { .. })));
        }

        #[test]
        fn passive_and_dead_refused() {
            let mut bench = Bench::new();
            let (result, _) = bench.request(SkillDefinition::new("aura").passive(), None);
            assert!(matches!(result, Err(CastRefusal::PassiveSkill(_))));

            if let Some(caster) = bench.arena.get_mut(bench.caster) {
                caster.combat.damage(1000.0);
            }
            let (result, _) = bench.request(SkillDefinition::new("x"), None);
            assert_eq!(result, Err(CastRefusal::CasterDead));
        }
    }

    mod preemption_tests {
        use super::*;

        fn slow(id: &str, priority: i32) -> SkillDefinition {
            SkillDefinition::new(id)
                .with_priority(priority)
                .with_timeline(ActionTimeline::new().then(5.0, Action::Cue { name: "end".into() }))
        }

        #[test]
        fn higher_priority_preempts() {
            let mut bench = Bench::new();
            let _ = bench.request(slow("low", 1), None);
            let (result, out) = bench.request(slow("high", 2), None);
            assert!(result.is_ok());
            assert_eq!(bench.executor.active_skill(), Some(&SkillId::new("high")));
            assert!(has_event(&out, |e| matches!(
                e,
                Event::CastInterrupted { reason: CancelReason::Preempted { .. }, .. }
            )));
        }

        #[test]
        fn equal_priority_blocked() {
            let mut bench = Bench::new();
            let _ = bench.request(slow("a", 1), None);
            let (result, _) = bench.request(slow("b", 1), None);
            assert!(matches!(result, Err(CastRefusal::Blocked { .. })));
            assert_eq!(bench.executor.active_skill(), Some(&SkillId::new("a")));
        }

        #[test]
        fn uninterruptible_blocks_under_external_only() {
            let mut bench = Bench::new();
            let _ = bench.request(slow("channel", 0).interruptible(false), None);
            let (result, _) = bench.request(slow("dodge", 5), None);
            assert!(matches!(result, Err(CastRefusal::Uninterruptible { .. })));
        }

        #[test]
        fn uninterruptible_yields_to_higher_under_self_violations() {
            let mut bench = Bench::new();
            bench.policy = InterruptPolicy::SelfViolations;
            let _ = bench.request(slow("channel", 0).interruptible(false), None);
            let (result, _) = bench.request(slow("dodge", 5), None);
            assert!(result.is_ok());
        }
    }

    mod casting_tests {
        use super::*;

        #[test]
        fn actions_fire_at_offsets_then_complete() {
            let mut bench = Bench::new();
            let _ = bench.request(strike(), None);

            let out = bench.tick();
            assert!(!out.iter().any(|e| matches!(e.output(), Output::Modifier(Modifier::ApplyDamage { .. }))));

            let out = bench.tick();
            assert!(out.iter().any(|e| matches!(
                e.output(),
                Output::Modifier(Modifier::ApplyDamage { amount, .. }) if (*amount - 20.0).abs() < 1e-6
            )));
            assert!(has_event(&out, |e| matches!(e, Event::CastCompleted { .. })));
            assert_eq!(bench.executor.phase(), SkillPhase::Idle);
        }

        #[test]
        fn movement_interrupts_when_forbidden() {
            let mut bench = Bench::new();
            let _ = bench.request(strike().cancelled_by_movement(true), None);
            if let Some(caster) = bench.arena.get_mut(bench.caster) {
                let mut transform = caster.transform;
                caster.motion.move_by(
                    &mut transform,
                    &riftcast_motion::MoveRequest::world(Vec3::X, 5.0),
                    DT,
                    0,
                );
                caster.transform = transform;
            }
            let out = bench.tick();
            assert!(has_event(&out, |e| matches!(
                e,
                Event::CastInterrupted { reason: CancelReason::Moved, .. }
            )));
            assert!(!out.iter().any(|e| matches!(e.output(), Output::Modifier(Modifier::ApplyDamage { .. }))));
        }

        #[test]
        fn depleted_resources_interrupt() {
            let mut bench = Bench::new();
            let skill = SkillDefinition::new("drain").with_timeline(ActionTimeline::new().then(
                0.3,
                Action::CollectCost { resource: ResourceKind::Mana, amount: 40.0, optional: false },
            ));
            let _ = bench.request(skill, None);
            if let Some(caster) = bench.arena.get_mut(bench.caster) {
                caster.combat.spend(ResourceKind::Mana, 20.0);
            }
            let out = bench.tick();
            assert!(has_event(&out, |e| matches!(
                e,
                Event::CastInterrupted { reason: CancelReason::ResourcesDepleted, .. }
            )));
        }

        #[test]
        fn optional_cost_skipped_when_unaffordable() {
            let mut bench = Bench::new();
            let skill = SkillDefinition::new("flourish").with_timeline(
                ActionTimeline::new()
                    .then(0.0, Action::CollectCost { resource: ResourceKind::Stamina, amount: 5.0, optional: true })
                    .then(0.0, Action::Cue { name: "spin".into() }),
            );
            let (result, out) = bench.request(skill, None);
            assert!(result.is_ok());
            assert!(!out.iter().any(|e| matches!(e.output(), Output::Modifier(_))));
            assert!(has_event(&out, |e| matches!(e, Event::CueTriggered { .. })));
        }

        #[test]
        fn caster_frame_force_is_rotated() {
            let mut bench = Bench::new();
            if let Some(caster) = bench.arena.get_mut(bench.caster) {
                caster.transform = riftcast_motion::Transform::facing(Vec3::ZERO, Vec3::X);
            }
            let skill = SkillDefinition::new("shove").with_timeline(ActionTimeline::new().then(
                0.0,
                Action::Force { force: Vec3::Z * 4.0, target: ActionTarget::Caster, frame: ForceFrame::Caster },
            ));
            let (_, out) = bench.request(skill, None);
            let force = out.iter().find_map(|e| match e.output() {
                Output::Command(Command::ApplyForce { force, .. }) => Some(*force),
                _ => None,
            });
            assert!(force.is_some_and(|f| (f - Vec3::X * 4.0).length() < 1e-4));
        }

        #[test]
        fn target_action_without_target_is_skipped() {
            let mut bench = Bench::new();
            let skill = SkillDefinition::new("slap").with_timeline(
                ActionTimeline::new().then(0.0, Action::Damage { amount: 5.0, target: ActionTarget::Target }),
            );
            let (_, out) = bench.request(skill, None);
            assert!(!out.iter().any(|e| matches!(e.output(), Output::Modifier(_))));
        }
    }

    mod charging_tests {
        use super::*;

        fn charged(profile: ChargeProfile) -> SkillDefinition {
            SkillDefinition::new("bolt")
                .with_charge(profile)
                .with_timeline(ActionTimeline::new().then(0.0, Action::Damage { amount: 10.0, target: ActionTarget::Caster }))
        }

        #[test]
        fn auto_release_at_required_time() {
            let mut bench = Bench::new();
            let (ticket, _) = bench.request(charged(ChargeProfile::new(0.3, 0.3)), None);
            assert_eq!(ticket.unwrap().phase, SkillPhase::Charging);

            assert!(bench.tick().iter().all(|e| !matches!(e.event(), Some(Event::CastStarted { .. }))));
            bench.tick();
            let out = bench.tick();
            assert!(has_event(&out, |e| matches!(e, Event::CastStarted { .. })));
            assert_eq!(bench.executor.phase(), SkillPhase::Casting);
        }

        #[test]
        fn held_charge_waits_for_release() {
            let mut bench = Bench::new();
            let _ = bench.request(charged(ChargeProfile::new(0.1, 1.0).held()), None);
            for _ in 0..3 {
                bench.tick();
            }
            assert_eq!(bench.executor.phase(), SkillPhase::Charging);
            assert!(bench.executor.release());
            let out = bench.tick();
            assert!(has_event(&out, |e| matches!(e, Event::CastStarted { .. })));
        }

        #[test]
        fn held_charge_releases_at_full_time() {
            let mut bench = Bench::new();
            let _ = bench.request(charged(ChargeProfile::new(0.1, 0.3).held()), None);
            let mut started = false;
            for _ in 0..3 {
                started |= has_event(&bench.tick(), |e| matches!(e, Event::CastStarted { .. }));
            }
            assert!(started);
        }

        #[test]
        fn potency_scales_damage() {
            let mut bench = Bench::new();
            let _ = bench.request(charged(ChargeProfile::new(0.1, 0.3).held()), None);
            let mut damage = None;
            for _ in 0..4 {
                for envelope in bench.tick() {
                    if let Output::Modifier(Modifier::ApplyDamage { amount, .. }) = envelope.output() {
                        damage = Some(*amount);
                    }
                }
            }
            let expected = 10.0 * 1.5;
            assert!(damage.is_some_and(|d| (d - expected).abs() < 1e-3));
        }

        #[test]
        fn movement_cancels_charge_with_no_effects() {
            let mut bench = Bench::new();
            let _ = bench.request(charged(ChargeProfile::new(0.5, 0.5).cancelled_by_movement(true)), None);
            if let Some(caster) = bench.arena.get_mut(bench.caster) {
                let mut transform = caster.transform;
                caster.motion.move_by(
                    &mut transform,
                    &riftcast_motion::MoveRequest::world(Vec3::Z, 5.0),
                    DT,
                    0,
                );
                caster.transform = transform;
            }
            let out = bench.tick();
            assert!(has_event(&out, |e| matches!(
                e,
                Event::ChargeCancelled { reason: CancelReason::Moved, .. }
            )));
            assert!(!out.iter().any(|e| matches!(e.output(), Output::Modifier(_))));
            assert_eq!(bench.executor.phase(), SkillPhase::Idle);
        }

        #[test]
        fn pre_charge_actions_fire_and_flush() {
            let mut bench = Bench::new();
            let profile = ChargeProfile::new(0.1, 0.1).with_pre_charge(
                ActionTimeline::new()
                    .then(0.0, Action::Cue { name: "gather".into() })
                    .then(5.0, Action::Cue { name: "late".into() }),
            );
            let (_, out) = bench.request(charged(profile), None);
            assert!(has_event(&out, |e| matches!(e, Event::CueTriggered { name, .. } if name == "gather")));
            let out = bench.tick();
            assert!(has_event(&out, |e| matches!(e, Event::CueTriggered { name, .. } if name == "late")));
            assert!(has_event(&out, |e| matches!(e, Event::CastStarted { .. })));
        }

        #[test]
        fn pre_charge_cost_counts_toward_affordability() {
            let mut bench = Bench::new();
            let profile = ChargeProfile::new(0.1, 0.1).with_pre_charge(ActionTimeline::new().then(
                0.0,
                Action::CollectCost { resource: ResourceKind::Mana, amount: 30.0, optional: false },
            ));
            let skill = charged(profile).with_timeline(
                ActionTimeline::new()
                    .then(0.0, Action::CollectCost { resource: ResourceKind::Mana, amount: 30.0, optional: false }),
            );
            let (result, out) = bench.request(skill, None);
            assert!(matches!(
                result,
                Err(CastRefusal::InsufficientResource { resource: ResourceKind::Mana, required, available })
                    if (required - 60.0).abs() < 1e-4 && (available - 50.0).abs() < 1e-4
            ));
            assert!(out.is_empty());
            assert_eq!(bench.executor.phase(), SkillPhase::Idle);
        }

        #[test]
        fn charge_fraction_reports_progress() {
            let mut bench = Bench::new();
            let _ = bench.request(charged(ChargeProfile::new(0.4, 0.4)), None);
            bench.tick();
            let caster = bench.arena.get(bench.caster).unwrap().clone();
            let fraction = bench.executor.charge_fraction(&caster, &bench.collab).unwrap();
            assert!((fraction - 0.25).abs() < 1e-4);
        }

        #[test]
        fn target_out_of_range_cancels_charge() {
            let mut bench = Bench::new();
            let skill = charged(ChargeProfile::new(1.0, 1.0))
                .with_targeting(Targeting::targeted(TargetPreference::Enemy, 5.0));
            let enemy = bench.enemy;
            assert!(bench.request(skill, Some(enemy)).0.is_ok());
            if let Some(entity) = bench.arena.get_mut(enemy) {
                entity.transform.position.z = 20.0;
            }
            let out = bench.tick();
            assert!(has_event(&out, |e| matches!(
                e,
                Event::ChargeCancelled { reason: CancelReason::TargetInvalid(CastRefusal::OutOfRange { .. }), .. }
            )));
        }
    }

    #[test]
    fn cooldowns_expire() {
        let mut bench = Bench::new();
        let _ = bench.request(strike(), None);
        for _ in 0..11 {
            bench.tick();
        }
        assert_eq!(bench.executor.cooldown_remaining(&SkillId::new("strike")), 0.0);
        assert_eq!(bench.executor.cooldowns().count(), 0);
    }

    #[test]
    fn caster_death_cancels() {
        let mut bench = Bench::new();
        let _ = bench.request(strike(), None);
        if let Some(caster) = bench.arena.get_mut(bench.caster) {
            caster.combat.damage(1000.0);
        }
        let out = bench.tick();
        assert!(has_event(&out, |e| matches!(
            e,
            Event::CastInterrupted { reason: CancelReason::CasterDied, .. }
        )));
    }
}
