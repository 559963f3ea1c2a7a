//! Self-Energy Actions
//!
//! Curiosity toward a seated part, questions along the self-ray, and
//! unburdening.

use session_events::{BiographyField, PartId};

use super::{require_part, ActionResult, UiFeedback};
use crate::error::ModelError;
use crate::transaction::ActContext;

/// Reply used when a part has nothing written for a field.
const SILENT_REPLY: &str = "...";

/// Extend curiosity toward a seated part.
///
/// Any blended part gets in the way: the action fails and each blended part
/// grows needier. Otherwise one model draw decides whether the part warms
/// up (trust rises, self-ray lands on it) or stays wary (need rises).
pub fn feel_toward(ctx: &mut ActContext<'_>, id: &PartId) -> Result<ActionResult, ModelError> {
    let name = require_part(ctx, id)?;
    if !ctx.model.is_target(id) {
        return Err(ModelError::NotATarget(id.clone()));
    }
    let trust = &ctx.tuning.trust;

    let blockers: Vec<PartId> = ctx.model.blended().keys().cloned().collect();
    if let Some(first) = blockers.first() {
        let mut result = ActionResult::fail(format!(
            "{} is blended with you; it is hard to feel curious",
            first
        ))
        .with_feedback(UiFeedback::Shake { part: first.clone() });
        for blocker in &blockers {
            ctx.model
                .adjust_need_attention(blocker, trust.blended_block_need_gain)?;
            result = result.with_change(format!("{} needs more attention", blocker));
        }
        return Ok(result);
    }

    let current = ctx.model.parts().require(id)?.trust;
    let chance = trust.feel_toward_base_chance + (1.0 - trust.feel_toward_base_chance) * current;
    if ctx.rng.model.chance(chance, "feel_toward") {
        let new_trust = ctx.model.adjust_trust(id, trust.feel_toward_gain)?;
        ctx.model.set_self_ray(id);
        Ok(ActionResult::ok(format!("{} senses your curiosity", name))
            .with_change(format!("trust {} {:.2}", id, new_trust))
            .with_change(format!("self-ray -> {}", id))
            .with_feedback(UiFeedback::Highlight { part: id.clone() }))
    } else {
        ctx.model.adjust_need_attention(id, trust.wary_need_gain)?;
        Ok(ActionResult::fail(format!("{} is wary of you", name))
            .with_change(format!("{} needs more attention", id))
            .with_feedback(UiFeedback::Shake { part: id.clone() }))
    }
}

/// Ask the part on the self-ray about one biography field.
///
/// If a seated proxy answers for the part, the reply bubble appears over the
/// proxy instead.
pub fn ray_field_select(
    ctx: &mut ActContext<'_>,
    id: &PartId,
    field: BiographyField,
) -> Result<ActionResult, ModelError> {
    let name = require_part(ctx, id)?;
    if ctx.model.self_ray() != Some(id) {
        return Ok(ActionResult::fail(format!(
            "You are not connected to {}",
            name
        )));
    }

    let part = ctx.model.parts().require(id)?;
    let threshold = ctx.tuning.trust.field_thresholds.for_field(field);
    if part.trust < threshold {
        return Ok(ActionResult::fail(format!(
            "{} is not ready to talk about its {}",
            name,
            field.as_str().replace('_', " ")
        ))
        .with_feedback(UiFeedback::Shake { part: id.clone() }));
    }

    let lines = part
        .dialogues
        .lines_for(field, part.biography.is_unburdened());
    let text = match ctx.rng.cosmetic.pick(lines, "ray_reply") {
        Some(line) => line.clone(),
        None => part
            .biography
            .content(field)
            .unwrap_or(SILENT_REPLY)
            .to_string(),
    };

    let speaker = ctx
        .model
        .relationships()
        .proxies_of(id)
        .find(|proxy| ctx.model.is_target(proxy))
        .cloned()
        .unwrap_or_else(|| id.clone());

    let first_time = ctx.model.reveal(id, field)?;
    ctx.model
        .add_thought_bubble(&speaker, text.clone(), ctx.tuning.cooldowns.bubble_lifetime);

    let mut result = ActionResult::ok(format!("{}: {}", name, text)).with_feedback(
        UiFeedback::ThoughtBubble {
            part: speaker.clone(),
            text,
        },
    );
    if first_time {
        result = result.with_change(format!("revealed {}.{}", id, field));
    }
    if &speaker != id {
        result = result.with_change(format!("{} answers for {}", speaker, id));
    }
    Ok(result)
}

/// Release the part's burden. Needs the job impact revealed and high trust.
pub fn unburden(ctx: &mut ActContext<'_>, id: &PartId) -> Result<ActionResult, ModelError> {
    let name = require_part(ctx, id)?;
    if !ctx.model.is_target(id) {
        return Err(ModelError::NotATarget(id.clone()));
    }
    let part = ctx.model.parts().require(id)?;
    if part.biography.is_unburdened() {
        return Ok(ActionResult::fail(format!("{} has already let go", name)));
    }
    if !part.biography.flags.is_revealed(BiographyField::JobImpact) {
        return Ok(ActionResult::fail(format!(
            "You do not yet know what {} carries",
            name
        )));
    }
    if part.trust < ctx.tuning.trust.unburden_trust {
        return Ok(ActionResult::fail(format!(
            "{} does not trust you enough yet",
            name
        ))
        .with_feedback(UiFeedback::Shake { part: id.clone() }));
    }

    ctx.model.mark_unburdened(id)?;
    ctx.model.set_need_attention(id, 0.0)?;
    ctx.model.set_attacked(id, false)?;
    Ok(ActionResult::ok(format!("{} sets its burden down", name))
        .with_change(format!("{} unburdened", id))
        .with_feedback(UiFeedback::Celebrate { part: id.clone() }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{pid, Harness};
    use session_events::{ActionName, ActionRequest, BiographyField, BlendReason};

    fn seated(ids: &[&str]) -> Harness {
        let mut h = Harness::new(ids);
        for id in ids {
            h.model.add_target_cloud(&pid(id));
        }
        h
    }

    #[test]
    fn test_feel_toward_blocked_by_blended_part() {
        let mut h = seated(&["critic"]);
        h.model.register_part(crate::PartState::new("exile", "Exile")).unwrap();
        h.model
            .add_blended_part(&pid("exile"), BlendReason::Spontaneous, 1.0);

        let result = h.run(ActionRequest::new(ActionName::FeelToward, "critic"));

        assert!(!result.success);
        assert_eq!(h.model.part(&pid("exile")).unwrap().need_attention, 0.3);
        assert_eq!(h.model.part(&pid("critic")).unwrap().trust, 0.5);
        assert!(h.model.self_ray().is_none());
        assert_eq!(h.rng.counts().model, 0);
    }

    #[test]
    fn test_feel_toward_certain_success() {
        let mut h = seated(&["critic"]);
        h.tuning.trust.feel_toward_base_chance = 1.0;

        let result = h.run(ActionRequest::new(ActionName::FeelToward, "critic"));

        assert!(result.success);
        assert!((h.model.part(&pid("critic")).unwrap().trust - 0.6).abs() < 1e-12);
        assert_eq!(h.model.self_ray(), Some(&pid("critic")));
        assert_eq!(h.rng.counts().model, 1);
    }

    #[test]
    fn test_feel_toward_certain_refusal() {
        let mut h = seated(&["critic"]);
        h.model.set_trust(&pid("critic"), 0.0).unwrap();
        h.tuning.trust.feel_toward_base_chance = 0.0;

        let result = h.run(ActionRequest::new(ActionName::FeelToward, "critic"));

        assert!(!result.success);
        assert_eq!(h.model.part(&pid("critic")).unwrap().need_attention, 0.2);
        assert!(h.model.self_ray().is_none());
    }

    #[test]
    fn test_ray_field_requires_self_ray() {
        let mut h = seated(&["critic"]);
        let request =
            ActionRequest::new(ActionName::RayFieldSelect, "critic").with_field(BiographyField::Age);
        assert!(!h.run(request).success);
    }

    #[test]
    fn test_ray_field_reveals_content() {
        let mut h = seated(&["critic"]);
        h.model.set_self_ray(&pid("critic"));

        let result = h.run(
            ActionRequest::new(ActionName::RayFieldSelect, "critic").with_field(BiographyField::Job),
        );

        assert!(result.success);
        assert_eq!(result.message, "critic: keeps watch");
        let part = h.model.part(&pid("critic")).unwrap();
        assert!(part.biography.flags.is_revealed(BiographyField::Job));
        assert_eq!(h.model.thought_bubbles().len(), 1);
        // Replies come from the cosmetic stream only
        assert_eq!(h.rng.counts().model, 0);
    }

    #[test]
    fn test_ray_field_needs_trust() {
        let mut h = seated(&["critic"]);
        h.model.set_self_ray(&pid("critic"));
        h.model.set_trust(&pid("critic"), 0.1).unwrap();

        let result = h.run(
            ActionRequest::new(ActionName::RayFieldSelect, "critic")
                .with_field(BiographyField::JobImpact),
        );
        assert!(!result.success);
        assert!(!h
            .model
            .part(&pid("critic"))
            .unwrap()
            .biography
            .flags
            .is_revealed(BiographyField::JobImpact));
    }

    #[test]
    fn test_proxy_answers_for_part() {
        let mut h = seated(&["critic", "planner"]);
        h.model.relationships_mut().add_proxy("critic", "planner");
        h.model.set_self_ray(&pid("critic"));

        h.run(ActionRequest::new(ActionName::RayFieldSelect, "critic").with_field(BiographyField::Age));

        assert_eq!(h.model.thought_bubbles()[0].part, pid("planner"));
    }

    #[test]
    fn test_unburden_flow() {
        let mut h = seated(&["critic"]);
        let request = ActionRequest::new(ActionName::Unburden, "critic");

        // Job impact unknown
        assert!(!h.run(request.clone()).success);

        h.model.reveal(&pid("critic"), BiographyField::JobImpact).unwrap();
        h.model.set_trust(&pid("critic"), 0.5).unwrap();
        assert!(!h.run(request.clone()).success);

        h.model.set_trust(&pid("critic"), 0.95).unwrap();
        h.model.set_need_attention(&pid("critic"), 2.0).unwrap();
        h.model.set_attacked(&pid("critic"), true).unwrap();
        assert!(h.run(request.clone()).success);

        let part = h.model.part(&pid("critic")).unwrap();
        assert!(part.biography.is_unburdened());
        assert_eq!(part.need_attention, 0.0);
        assert!(!part.attacked);

        assert!(!h.run(request).success);
    }
}
