//! State Diff
//!
//! What one transaction changed, computed by comparing the model before and
//! after. Membership, trust, reveals and victory are discrete changes and are
//! always traced; need drift and the clock are continuous and only traced at
//! debug level.

use std::collections::BTreeSet;
use std::fmt::Write;

use session_events::{BiographyField, PartId};

use crate::model::SimulatorModel;

/// Below this, value changes are not reported.
const VALUE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDiff {
    pub targets_added: Vec<PartId>,
    pub targets_removed: Vec<PartId>,
    pub blended_added: Vec<PartId>,
    pub blended_removed: Vec<PartId>,
    pub separating: Vec<PartId>,
    pub pending_added: Vec<PartId>,
    pub pending_removed: Vec<PartId>,
    pub supporting_added: Vec<PartId>,
    pub supporting_removed: Vec<PartId>,
    pub displaced_added: Vec<PartId>,
    pub displaced_removed: Vec<PartId>,
    /// (before, after)
    pub self_ray: Option<(Option<PartId>, Option<PartId>)>,
    /// (part, before, after)
    pub trust: Vec<(PartId, f64, f64)>,
    pub need_attention: Vec<(PartId, f64, f64)>,
    pub blend_degree: Vec<(PartId, f64, f64)>,
    pub revealed: Vec<(PartId, &'static str)>,
    pub attacked: Vec<(PartId, bool)>,
    pub messages_sent: usize,
    pub messages_removed: usize,
    pub bubbles_added: usize,
    pub bubbles_removed: usize,
    pub victory: bool,
    pub ticks: u64,
    pub timers_changed: bool,
}

impl StateDiff {
    pub fn between(before: &SimulatorModel, after: &SimulatorModel) -> Self {
        let mut diff = StateDiff::default();

        let (added, removed) = set_delta(before.targets().iter(), after.targets().iter());
        diff.targets_added = added;
        diff.targets_removed = removed;

        let (added, removed) = set_delta(before.blended().keys(), after.blended().keys());
        diff.blended_added = added;
        diff.blended_removed = removed;

        let (added, removed) = set_delta(
            before.pending_blends().map(|p| &p.part),
            after.pending_blends().map(|p| &p.part),
        );
        diff.pending_added = added;
        diff.pending_removed = removed;

        let (added, removed) = set_delta(
            before.supporting().values().flatten(),
            after.supporting().values().flatten(),
        );
        diff.supporting_added = added;
        diff.supporting_removed = removed;

        let (added, removed) = set_delta(before.displaced().iter(), after.displaced().iter());
        diff.displaced_added = added;
        diff.displaced_removed = removed;

        for (id, state) in after.blended() {
            if let Some(old) = before.blend_state(id) {
                if state.separating && !old.separating {
                    diff.separating.push(id.clone());
                }
                if (state.degree - old.degree).abs() > VALUE_EPSILON {
                    diff.blend_degree.push((id.clone(), old.degree, state.degree));
                }
            }
        }

        if before.self_ray() != after.self_ray() {
            diff.self_ray = Some((before.self_ray().cloned(), after.self_ray().cloned()));
        }

        for part in after.parts().iter() {
            let Some(old) = before.part(&part.id) else {
                continue;
            };
            if (part.trust - old.trust).abs() > VALUE_EPSILON {
                diff.trust.push((part.id.clone(), old.trust, part.trust));
            }
            if (part.need_attention - old.need_attention).abs() > VALUE_EPSILON {
                diff.need_attention
                    .push((part.id.clone(), old.need_attention, part.need_attention));
            }
            if part.attacked != old.attacked {
                diff.attacked.push((part.id.clone(), part.attacked));
            }
            for field in BiographyField::ALL {
                if part.biography.flags.is_revealed(field) && !old.biography.flags.is_revealed(field)
                {
                    diff.revealed.push((part.id.clone(), field.as_str()));
                }
            }
            if part.biography.is_unburdened() && !old.biography.is_unburdened() {
                diff.revealed.push((part.id.clone(), "unburdened"));
            }
        }

        let before_messages: BTreeSet<u64> = before.messages().iter().map(|m| m.id).collect();
        let after_messages: BTreeSet<u64> = after.messages().iter().map(|m| m.id).collect();
        diff.messages_sent = after_messages.difference(&before_messages).count();
        diff.messages_removed = before_messages.difference(&after_messages).count();

        let before_bubbles: BTreeSet<u64> = before.thought_bubbles().iter().map(|b| b.id).collect();
        let after_bubbles: BTreeSet<u64> = after.thought_bubbles().iter().map(|b| b.id).collect();
        diff.bubbles_added = after_bubbles.difference(&before_bubbles).count();
        diff.bubbles_removed = before_bubbles.difference(&after_bubbles).count();

        diff.victory = after.victory() && !before.victory();
        diff.ticks = after.tick().saturating_sub(before.tick());
        diff.timers_changed = before.timers() != after.timers();
        diff
    }

    /// True if membership, trust, reveals, messages or victory changed.
    pub fn is_discrete(&self) -> bool {
        !(self.targets_added.is_empty()
            && self.targets_removed.is_empty()
            && self.blended_added.is_empty()
            && self.blended_removed.is_empty()
            && self.separating.is_empty()
            && self.pending_added.is_empty()
            && self.pending_removed.is_empty()
            && self.supporting_added.is_empty()
            && self.supporting_removed.is_empty()
            && self.displaced_added.is_empty()
            && self.displaced_removed.is_empty()
            && self.self_ray.is_none()
            && self.trust.is_empty()
            && self.revealed.is_empty()
            && self.attacked.is_empty()
            && self.messages_sent == 0
            && self.messages_removed == 0
            && self.bubbles_added == 0
            && !self.victory)
    }

    /// True if the view needs to re-derive its targets.
    pub fn touches_view(&self) -> bool {
        self.is_discrete() || !self.blend_degree.is_empty() || self.bubbles_removed > 0
    }

    pub fn is_empty(&self) -> bool {
        !self.is_discrete()
            && self.need_attention.is_empty()
            && self.blend_degree.is_empty()
            && self.bubbles_removed == 0
            && self.ticks == 0
            && !self.timers_changed
    }

    /// One-line human-readable summary.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let mut push = |text: String| {
            if !out.is_empty() {
                out.push_str("; ");
            }
            out.push_str(&text);
        };

        for (label, ids) in [
            ("+target", &self.targets_added),
            ("-target", &self.targets_removed),
            ("+blended", &self.blended_added),
            ("-blended", &self.blended_removed),
            ("separating", &self.separating),
            ("+pending", &self.pending_added),
            ("-pending", &self.pending_removed),
            ("+supporting", &self.supporting_added),
            ("-supporting", &self.supporting_removed),
            ("+displaced", &self.displaced_added),
            ("-displaced", &self.displaced_removed),
        ] {
            if !ids.is_empty() {
                push(format!("{} {}", label, join_ids(ids)));
            }
        }
        if let Some((from, to)) = &self.self_ray {
            push(format!("self-ray {} -> {}", opt_id(from), opt_id(to)));
        }
        for (id, from, to) in &self.trust {
            push(format!("trust {} {:.3} -> {:.3}", id, from, to));
        }
        for (id, field) in &self.revealed {
            push(format!("revealed {}.{}", id, field));
        }
        for (id, attacked) in &self.attacked {
            push(format!("{} {}", if *attacked { "attacked" } else { "calmed" }, id));
        }
        if self.messages_sent > 0 {
            push(format!("{} message(s) sent", self.messages_sent));
        }
        if self.messages_removed > 0 {
            push(format!("{} message(s) delivered", self.messages_removed));
        }
        if self.bubbles_added > 0 {
            push(format!("{} bubble(s)", self.bubbles_added));
        }
        if self.victory {
            push("victory".to_string());
        }
        if out.is_empty() {
            let mut quiet = String::from("no discrete change");
            if !self.need_attention.is_empty() {
                let _ = write!(quiet, ", need drift on {} part(s)", self.need_attention.len());
            }
            return quiet;
        }
        out
    }
}

fn set_delta<'a>(
    before: impl Iterator<Item = &'a PartId>,
    after: impl Iterator<Item = &'a PartId>,
) -> (Vec<PartId>, Vec<PartId>) {
    let before: BTreeSet<&PartId> = before.collect();
    let after: BTreeSet<&PartId> = after.collect();
    let added = after.difference(&before).map(|id| (*id).clone()).collect();
    let removed = before.difference(&after).map(|id| (*id).clone()).collect();
    (added, removed)
}

fn join_ids(ids: &[PartId]) -> String {
    ids.iter().map(PartId::as_str).collect::<Vec<_>>().join(",")
}

fn opt_id(id: &Option<PartId>) -> &str {
    id.as_ref().map(PartId::as_str).unwrap_or("none")
}
