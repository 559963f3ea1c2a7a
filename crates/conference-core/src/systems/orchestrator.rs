//! Orchestrator
//!
//! The per-tick driver. One call advances the clock and timers, delivers
//! arrived messages, drifts attention need, lets seated parts air
//! grievances, evaluates attention demands, expires thought bubbles, and
//! checks for victory. It runs inside one system transaction per tick.

use session_events::{ActionName, ActionRequest, PartId};

use crate::actions::apply_action;
use crate::model::AttentionDemand;
use crate::transaction::ActContext;

/// Fallback texts when a part has nothing scripted
pub mod orchestrator_constants {
    pub const DEFAULT_GRIEVANCE: &str = "You always get in the way.";
    pub const DEFAULT_REACTION: &str = "That hurt.";
    pub const WANTS_ATTENTION: &str = "Notice me...";
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Ids of messages delivered this tick
    pub delivered: Vec<u64>,
    /// Id of a grievance message sent this tick
    pub sent: Option<u64>,
    pub attention: Option<AttentionDemand>,
    /// Part that started a spontaneous blend this tick
    pub spontaneous_blend: Option<PartId>,
    pub victory: bool,
}

/// Runs one orchestrator tick of `dt` seconds.
pub fn advance(ctx: &mut ActContext<'_>, dt: f64) -> TickReport {
    ctx.model.advance_clock(dt);
    let mut report = TickReport {
        tick: ctx.model.tick(),
        ..Default::default()
    };

    deliver_messages(ctx, dt, &mut report);
    drift_need(ctx, dt);
    air_grievance(ctx, &mut report);
    check_attention(ctx, &mut report);

    ctx.model.expire_thought_bubbles();
    report.victory = ctx.model.check_and_set_victory(&ctx.tuning.victory);
    report
}

/// Arrived messages cost the receiver trust, raise its need, and mark it
/// attacked.
fn deliver_messages(ctx: &mut ActContext<'_>, dt: f64, report: &mut TickReport) {
    let config = &ctx.tuning.messages;
    for message in ctx.model.advance_messages(dt) {
        let receiver = &message.target;
        if ctx.model.part(receiver).is_some() {
            let applied = ctx
                .model
                .adjust_trust(receiver, -config.trust_penalty)
                .and_then(|_| ctx.model.adjust_need_attention(receiver, config.need_gain))
                .and_then(|_| ctx.model.set_attacked(receiver, true));
            if let Err(e) = applied {
                tracing::warn!(id = message.id, "cannot apply delivered message: {}", e);
            }

            let reaction = ctx
                .model
                .part(receiver)
                .and_then(|p| ctx.rng.cosmetic.pick(&p.dialogues.reactions, "reaction_line"))
                .cloned()
                .unwrap_or_else(|| orchestrator_constants::DEFAULT_REACTION.to_string());
            ctx.model
                .add_thought_bubble(receiver, reaction, ctx.tuning.cooldowns.bubble_lifetime);
        }
        ctx.model.remove_message(message.id);
        tracing::debug!(from = %message.sender, to = %receiver, "message delivered");
        report.delivered.push(message.id);
    }
}

/// Burdened parts outside the conference grow needier; seated parts calm down.
fn drift_need(ctx: &mut ActContext<'_>, dt: f64) {
    let config = &ctx.tuning.attention;
    let ids: Vec<PartId> = ctx.model.parts().ids().cloned().collect();
    for id in ids {
        let unburdened = ctx
            .model
            .part(&id)
            .is_some_and(|p| p.biography.is_unburdened());
        let delta = if ctx.model.is_target(&id) {
            -config.seated_relief_per_sec * dt
        } else if !unburdened && !ctx.model.is_conferencing(&id) && !ctx.model.displaced().contains(&id)
        {
            config.idle_growth_per_sec * dt
        } else {
            continue;
        };
        if let Err(e) = ctx.model.adjust_need_attention(&id, delta) {
            tracing::warn!(part = %id, "cannot drift need: {}", e);
        }
    }
}

/// When the dialogue cooldown is up, one seated part sends a grievance line
/// to another seated part it resents.
fn air_grievance(ctx: &mut ActContext<'_>, report: &mut TickReport) {
    if ctx.model.timers().dialogue_cooldown > 0.0 {
        return;
    }
    let model = &*ctx.model;
    let pairs: Vec<(PartId, PartId)> = model
        .targets()
        .iter()
        .flat_map(move |source| {
            model
                .relationships()
                .grievance_targets(source)
                .filter(move |target| model.is_target(target))
                .map(move |target| (source.clone(), target.clone()))
        })
        .collect();

    let Some(index) = ctx.rng.model.index(pairs.len(), "grievance_pair") else {
        return;
    };
    let (source, target) = &pairs[index];
    let text = ctx
        .rng
        .cosmetic
        .pick(ctx.model.relationships().grievance_lines(source, target), "grievance_line")
        .cloned()
        .unwrap_or_else(|| orchestrator_constants::DEFAULT_GRIEVANCE.to_string());

    let id = ctx
        .model
        .send_message(source, target, text, ctx.tuning.messages.travel_time);
    ctx.model.timers_mut().dialogue_cooldown = ctx.tuning.cooldowns.dialogue;
    tracing::debug!(from = %source, to = %target, "grievance sent");
    report.sent = Some(id);
}

/// When the attention timer is up, find the neediest eligible part. An urgent
/// demand takes over the conference; otherwise the part blends in on its own
/// if the room is empty, or waits its turn with a thought bubble.
fn check_attention(ctx: &mut ActContext<'_>, report: &mut TickReport) {
    if ctx.model.timers().attention_check > 0.0 {
        return;
    }
    ctx.model.timers_mut().attention_check = ctx.tuning.attention.check_interval;

    let Some(demand) = ctx
        .model
        .evaluate_attention_demand(&mut ctx.rng.model, &ctx.tuning.attention)
    else {
        return;
    };

    if demand.urgent {
        ctx.model.part_demands_attention(&demand.part);
    } else if !ctx.model.conference_occupied() && ctx.model.timers().blend_cooldown <= 0.0 {
        let request = ActionRequest::new(ActionName::SpontaneousBlend, demand.part.clone());
        if apply_action(ctx, &request).success {
            ctx.model.timers_mut().blend_cooldown = ctx.tuning.cooldowns.blend;
            report.spontaneous_blend = Some(demand.part.clone());
        }
    } else if ctx.model.pending_attention_demand() != Some(&demand.part) {
        ctx.model
            .set_pending_attention_demand(Some(demand.part.clone()));
        ctx.model.add_thought_bubble(
            &demand.part,
            orchestrator_constants::WANTS_ATTENTION,
            ctx.tuning.cooldowns.bubble_lifetime,
        );
    }
    report.attention = Some(demand);
}
