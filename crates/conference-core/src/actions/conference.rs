//! Conference Actions
//!
//! Moving parts into, out of, and around the conference.

use session_events::{BlendReason, PartId};

use super::{require_part, ActionResult, UiFeedback};
use crate::error::ModelError;
use crate::transaction::ActContext;

/// Idle or supporting parts take a seat; a blended part starts separating.
pub fn notice_part(ctx: &mut ActContext<'_>, id: &PartId) -> Result<ActionResult, ModelError> {
    let name = require_part(ctx, id)?;
    let model = &mut *ctx.model;

    if let Some(state) = model.blend_state(id) {
        if state.separating {
            return Ok(ActionResult::fail(format!("{} is already separating", name)));
        }
        model.begin_separation(id);
        return Ok(ActionResult::ok(format!("{} agrees to give you some space", name))
            .with_change(format!("{} separating", id))
            .with_feedback(UiFeedback::Highlight { part: id.clone() }));
    }
    if model.is_target(id) {
        return Ok(ActionResult::fail(format!("{} is already in the conference", name)));
    }
    if model.is_pending(id) {
        return Ok(ActionResult::fail(format!("{} is already on its way in", name)));
    }

    model.add_target_cloud(id);
    Ok(ActionResult::ok(format!("You notice {}", name))
        .with_change(format!("+target {}", id))
        .with_feedback(UiFeedback::Highlight { part: id.clone() }))
}

/// The part heads for the center on its own.
pub fn spontaneous_blend(
    ctx: &mut ActContext<'_>,
    id: &PartId,
) -> Result<ActionResult, ModelError> {
    let name = require_part(ctx, id)?;
    if !ctx.model.enqueue_pending_blend(id, BlendReason::Spontaneous) {
        return Ok(ActionResult::fail(format!("{} cannot blend right now", name)));
    }
    Ok(ActionResult::ok(format!("{} is taking over", name))
        .with_change(format!("+pending {}", id)))
}

/// A seated part is deliberately allowed to blend.
pub fn blend(ctx: &mut ActContext<'_>, id: &PartId) -> Result<ActionResult, ModelError> {
    let name = require_part(ctx, id)?;
    if !ctx.model.is_target(id) {
        return Err(ModelError::NotATarget(id.clone()));
    }
    ctx.model.remove_target_cloud(id);
    ctx.model.enqueue_pending_blend(id, BlendReason::UserInitiated);
    Ok(ActionResult::ok(format!("You let {} blend with you", name))
        .with_change(format!("-target {}", id))
        .with_change(format!("+pending {}", id)))
}

/// A seated or supporting part leaves the conference.
pub fn dismiss_part(ctx: &mut ActContext<'_>, id: &PartId) -> Result<ActionResult, ModelError> {
    let name = require_part(ctx, id)?;
    if ctx.model.remove_supporting_part(id) {
        return Ok(ActionResult::ok(format!("{} steps back", name))
            .with_change(format!("-supporting {}", id)));
    }
    if !ctx.model.is_target(id) {
        return Err(ModelError::NotATarget(id.clone()));
    }
    ctx.model.remove_target_cloud(id);
    Ok(ActionResult::ok(format!("{} leaves the conference", name))
        .with_change(format!("-target {}", id)))
}

/// Seat `id` beside the seated part `target`.
pub fn invite_part(
    ctx: &mut ActContext<'_>,
    id: &PartId,
    target: &PartId,
) -> Result<ActionResult, ModelError> {
    let name = require_part(ctx, id)?;
    let target_name = require_part(ctx, target)?;
    if !ctx.model.is_target(target) {
        return Err(ModelError::NotATarget(target.clone()));
    }
    if !ctx.model.add_supporting_part(target, id) {
        return Ok(ActionResult::fail(format!(
            "{} cannot sit with {} right now",
            name, target_name
        )));
    }
    Ok(ActionResult::ok(format!("{} sits beside {}", name, target_name))
        .with_change(format!("+supporting {} -> {}", id, target)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{pid, Harness};
    use session_events::{ActionName, ActionRequest, BlendReason};

    #[test]
    fn test_notice_idle_part_seats_it() {
        let mut h = Harness::new(&["critic"]);
        let result = h.run(ActionRequest::new(ActionName::NoticePart, "critic"));

        assert!(result.success);
        assert_eq!(h.model.targets(), &[pid("critic")]);
    }

    #[test]
    fn test_notice_blended_part_starts_separation() {
        let mut h = Harness::new(&["critic"]);
        h.model
            .add_blended_part(&pid("critic"), BlendReason::Spontaneous, 1.0);

        assert!(h.run(ActionRequest::new(ActionName::NoticePart, "critic")).success);
        assert!(h.model.blend_state(&pid("critic")).unwrap().separating);
        // Still blended until the view reports the unblend finished
        assert!(!h.model.is_target(&pid("critic")));

        assert!(!h.run(ActionRequest::new(ActionName::NoticePart, "critic")).success);
    }

    #[test]
    fn test_notice_target_fails() {
        let mut h = Harness::new(&["critic"]);
        h.model.add_target_cloud(&pid("critic"));
        let result = h.run(ActionRequest::new(ActionName::NoticePart, "critic"));
        assert!(!result.success);
        assert_eq!(h.model.targets().len(), 1);
    }

    #[test]
    fn test_blend_moves_target_to_pending() {
        let mut h = Harness::new(&["critic"]);
        h.model.add_target_cloud(&pid("critic"));

        assert!(h.run(ActionRequest::new(ActionName::Blend, "critic")).success);
        assert!(h.model.targets().is_empty());
        let pending: Vec<_> = h.model.pending_blends().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reason, BlendReason::UserInitiated);
    }

    #[test]
    fn test_blend_requires_target() {
        let mut h = Harness::new(&["critic"]);
        let result = h.run(ActionRequest::new(ActionName::Blend, "critic"));
        assert!(!result.success);
        assert_eq!(h.model.pending_blends().count(), 0);
    }

    #[test]
    fn test_spontaneous_blend_queues_once() {
        let mut h = Harness::new(&["exile"]);
        assert!(h.run(ActionRequest::new(ActionName::SpontaneousBlend, "exile")).success);
        assert!(!h.run(ActionRequest::new(ActionName::SpontaneousBlend, "exile")).success);
        assert_eq!(h.model.pending_blends().count(), 1);
    }

    #[test]
    fn test_dismiss_target_and_supporter() {
        let mut h = Harness::new(&["lead", "helper"]);
        h.model.add_target_cloud(&pid("lead"));
        h.model.add_supporting_part(&pid("lead"), &pid("helper"));

        assert!(h.run(ActionRequest::new(ActionName::DismissPart, "helper")).success);
        assert!(h.model.supporting_parts(&pid("lead")).is_empty());

        assert!(h.run(ActionRequest::new(ActionName::DismissPart, "lead")).success);
        assert!(h.model.targets().is_empty());

        assert!(!h.run(ActionRequest::new(ActionName::DismissPart, "lead")).success);
    }

    #[test]
    fn test_invite_part_attaches_supporter() {
        let mut h = Harness::new(&["lead", "helper"]);
        h.model.add_target_cloud(&pid("lead"));

        let result = h.run(ActionRequest::new(ActionName::InvitePart, "helper").with_target("lead"));
        assert!(result.success, "{}", result.message);
        assert_eq!(h.model.supporting_parts(&pid("lead")), &[pid("helper")]);
    }

    #[test]
    fn test_invite_to_unseated_target_fails() {
        let mut h = Harness::new(&["lead", "helper"]);
        let result = h.run(ActionRequest::new(ActionName::InvitePart, "helper").with_target("lead"));
        assert!(!result.success);
    }
}
