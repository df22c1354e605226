//! Target resolution and spatial checks.

use glam::Vec3;
use riftcast_motion::horizontal;
use tracing::error;

use crate::collab::LineOfSight;
use crate::entity::{Entity, EntityId};
use crate::error::{CastRefusal, CastResult};
use crate::skill::{SkillDefinition, TargetPreference};
use crate::world_view::WorldView;

/// Resolves the target of a cast request.
///
/// Returns `Ok(None)` for skills that need no target. A friendly skill whose
/// selection is missing, dead or hostile falls back to the caster. Spatial
/// checks (range, angle, line of sight) apply to any target other than the
/// caster.
///
/// # Errors
///
/// The first failed check as a [`CastRefusal`].
pub fn resolve_target(
    skill: &SkillDefinition,
    caster: &Entity,
    selected: Option<EntityId>,
    view: &WorldView<'_>,
    line_of_sight: &dyn LineOfSight,
) -> CastResult<Option<EntityId>> {
    let targeting = &skill.targeting;
    if !targeting.needs_target {
        return Ok(None);
    }
    if targeting.preference == TargetPreference::None {
        error!(skill = %skill.id, "skill needs a target but prefers none");
        return Err(CastRefusal::Misconfigured {
            skill: skill.id.clone(),
            reason: "needs a target but its preference is none".to_string(),
        });
    }

    let candidate = selected.and_then(|id| view.get_entity(id));
    let accepted = candidate.map(|target| check_identity(skill, caster, target));

    match (candidate, accepted) {
        (Some(target), Some(Ok(()))) => {
            check_spatial(skill, caster, target, line_of_sight)?;
            Ok(Some(target.id()))
        }
        _ if targeting.preference == TargetPreference::Friendly
            && targeting.life_state.accepts(caster.is_alive()) =>
        {
            Ok(Some(caster.id()))
        }
        (_, Some(Err(refusal))) => Err(refusal),
        _ => Err(CastRefusal::NoTarget),
    }
}

/// Re-validates an already resolved target.
///
/// # Errors
///
/// [`CastRefusal::NoTarget`] if the target left the arena, otherwise the
/// first failed identity or spatial check.
pub fn recheck_target(
    skill: &SkillDefinition,
    caster: &Entity,
    target: Option<EntityId>,
    view: &WorldView<'_>,
    line_of_sight: &dyn LineOfSight,
) -> CastResult<()> {
    let Some(id) = target else {
        return Ok(());
    };
    let target = view.get_entity(id).ok_or(CastRefusal::NoTarget)?;
    check_identity(skill, caster, target)?;
    check_spatial(skill, caster, target, line_of_sight)
}

fn check_identity(skill: &SkillDefinition, caster: &Entity, target: &Entity) -> CastResult<()> {
    let targeting = &skill.targeting;
    let preferred = match targeting.preference {
        TargetPreference::Any => true,
        TargetPreference::Enemy => !caster.is_friendly_with(target),
        TargetPreference::Friendly => caster.is_friendly_with(target),
        TargetPreference::None => false,
    };
    if !preferred {
        return Err(CastRefusal::TargetMismatch {
            target: target.id(),
            preference: targeting.preference,
        });
    }
    if !targeting.life_state.accepts(target.is_alive()) {
        return Err(CastRefusal::TargetLifeState {
            target: target.id(),
            required: targeting.life_state,
        });
    }
    Ok(())
}

fn check_spatial(
    skill: &SkillDefinition,
    caster: &Entity,
    target: &Entity,
    line_of_sight: &dyn LineOfSight,
) -> CastResult<()> {
    if target.id() == caster.id() {
        return Ok(());
    }
    let targeting = &skill.targeting;
    let offset = target.position() - caster.position();

    let distance = offset.length();
    if distance > targeting.range {
        return Err(CastRefusal::OutOfRange {
            distance,
            range: targeting.range,
        });
    }

    let angle = angle_from_forward(caster.forward(), offset);
    if angle > targeting.max_angle {
        return Err(CastRefusal::OutsideAngle {
            angle,
            max_angle: targeting.max_angle,
        });
    }

    if targeting.requires_line_of_sight
        && !line_of_sight.is_visible(caster.position(), target.position())
    {
        return Err(CastRefusal::NoLineOfSight { target: target.id() });
    }
    Ok(())
}

/// Horizontal angle in degrees between `forward` and `offset`. Zero when
/// either has no horizontal extent.
#[must_use]
pub fn angle_from_forward(forward: Vec3, offset: Vec3) -> f32 {
    match (horizontal(forward).try_normalize(), horizontal(offset).try_normalize()) {
        (Some(a), Some(b)) => a.dot(b).clamp(-1.0, 1.0).acos().to_degrees(),
        _ => 0.0,
    }
}
