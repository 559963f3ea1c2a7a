//! Simulator Model
//!
//! The authoritative session state: the part store, the relationship graph,
//! and who is in the conference and in which role.
//!
//! Every id is in at most one of: seated targets, blended parts, the pending
//! blend queue, or a target's supporting list. All mutators keep that true.
//! Mutators addressing unregistered parts are no-ops.

mod attention;
mod invariants;
mod messages;
mod snapshot;

pub use attention::AttentionDemand;
pub use invariants::InvariantViolation;
pub use messages::{Message, ThoughtBubble};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use session_events::{BiographyField, BlendReason, OrchestratorTimers, PartId};

use crate::components::{PartState, PartStore, Relationships};
use crate::error::ModelError;

/// Blend degree bounds
pub mod blend_constants {
    pub const MIN_DEGREE: f64 = 0.0;
    pub const MAX_DEGREE: f64 = 1.0;
}

/// A part currently blended with self.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendState {
    /// 1.0 is fully blended
    pub degree: f64,
    pub reason: BlendReason,
    /// The part has agreed to separate; the view animates it out of the
    /// center before it is seated
    #[serde(default)]
    pub separating: bool,
}

/// A blend queued to happen once the part reaches the center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBlend {
    pub part: PartId,
    pub reason: BlendReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorModel {
    parts: PartStore,
    #[serde(default)]
    relationships: Relationships,
    #[serde(default)]
    targets: Vec<PartId>,
    #[serde(default)]
    blended: BTreeMap<PartId, BlendState>,
    #[serde(default)]
    pending_blends: VecDeque<PendingBlend>,
    /// target -> parts sitting beside it
    #[serde(default)]
    supporting: BTreeMap<PartId, Vec<PartId>>,
    #[serde(default)]
    self_ray: Option<PartId>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    thought_bubbles: Vec<ThoughtBubble>,
    /// Parts pushed out by an attention demand whose exit has not finished
    #[serde(default)]
    displaced: BTreeSet<PartId>,
    #[serde(default)]
    victory: bool,
    #[serde(default)]
    tick: u64,
    #[serde(default)]
    elapsed: f64,
    /// Multiplier on attention-need increases
    #[serde(default = "default_amplification")]
    self_amplification: f64,
    /// A part that wanted attention while the conference was busy
    #[serde(default)]
    pending_attention_demand: Option<PartId>,
    #[serde(default)]
    timers: OrchestratorTimers,
    #[serde(default)]
    next_message_id: u64,
    #[serde(default)]
    next_bubble_id: u64,
}

fn default_amplification() -> f64 {
    1.0
}

impl Default for SimulatorModel {
    fn default() -> Self {
        Self::new(PartStore::new(), Relationships::new())
    }
}

impl SimulatorModel {
    pub fn new(parts: PartStore, relationships: Relationships) -> Self {
        Self {
            parts,
            relationships,
            targets: Vec::new(),
            blended: BTreeMap::new(),
            pending_blends: VecDeque::new(),
            supporting: BTreeMap::new(),
            self_ray: None,
            messages: Vec::new(),
            thought_bubbles: Vec::new(),
            displaced: BTreeSet::new(),
            victory: false,
            tick: 0,
            elapsed: 0.0,
            self_amplification: default_amplification(),
            pending_attention_demand: None,
            timers: OrchestratorTimers::default(),
            next_message_id: 1,
            next_bubble_id: 1,
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    // --- Read accessors ---

    pub fn parts(&self) -> &PartStore {
        &self.parts
    }

    pub fn part(&self, id: &PartId) -> Option<&PartState> {
        self.parts.get(id)
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Seated parts in seating order.
    pub fn targets(&self) -> &[PartId] {
        &self.targets
    }

    pub fn blended(&self) -> &BTreeMap<PartId, BlendState> {
        &self.blended
    }

    pub fn blend_state(&self, id: &PartId) -> Option<&BlendState> {
        self.blended.get(id)
    }

    pub fn pending_blends(&self) -> impl Iterator<Item = &PendingBlend> {
        self.pending_blends.iter()
    }

    pub fn supporting(&self) -> &BTreeMap<PartId, Vec<PartId>> {
        &self.supporting
    }

    pub fn supporting_parts(&self, target: &PartId) -> &[PartId] {
        self.supporting.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn self_ray(&self) -> Option<&PartId> {
        self.self_ray.as_ref()
    }

    pub fn displaced(&self) -> &BTreeSet<PartId> {
        &self.displaced
    }

    pub fn victory(&self) -> bool {
        self.victory
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn self_amplification(&self) -> f64 {
        self.self_amplification
    }

    pub fn pending_attention_demand(&self) -> Option<&PartId> {
        self.pending_attention_demand.as_ref()
    }

    pub fn timers(&self) -> &OrchestratorTimers {
        &self.timers
    }

    // --- Membership queries ---

    pub fn is_target(&self, id: &PartId) -> bool {
        self.targets.contains(id)
    }

    pub fn is_blended(&self, id: &PartId) -> bool {
        self.blended.contains_key(id)
    }

    pub fn is_pending(&self, id: &PartId) -> bool {
        self.pending_blends.iter().any(|p| &p.part == id)
    }

    /// Proxy status comes from the relationship graph rather than a stored
    /// per-part flag, so the two cannot disagree.
    pub fn is_proxy(&self, id: &PartId) -> bool {
        self.relationships.is_proxy(id)
    }

    /// The target `id` is supporting, if any.
    pub fn supporting_target_of(&self, id: &PartId) -> Option<&PartId> {
        self.supporting
            .iter()
            .find(|(_, list)| list.contains(id))
            .map(|(target, _)| target)
    }

    /// Seated, blended, queued or supporting.
    pub fn is_conferencing(&self, id: &PartId) -> bool {
        self.is_target(id)
            || self.is_blended(id)
            || self.is_pending(id)
            || self.supporting_target_of(id).is_some()
    }

    /// Anyone seated, blended or on the way in.
    pub fn conference_occupied(&self) -> bool {
        !self.targets.is_empty() || !self.blended.is_empty() || !self.pending_blends.is_empty()
    }

    // --- Part values ---

    pub fn register_part(&mut self, part: PartState) -> Result<(), ModelError> {
        self.parts.register(part)
    }

    pub fn relationships_mut(&mut self) -> &mut Relationships {
        &mut self.relationships
    }

    pub fn set_self_amplification(&mut self, amplification: f64) {
        self.self_amplification = amplification.max(0.0);
    }

    pub fn adjust_trust(&mut self, id: &PartId, delta: f64) -> Result<f64, ModelError> {
        self.parts.adjust_trust(id, delta)
    }

    pub fn set_trust(&mut self, id: &PartId, trust: f64) -> Result<(), ModelError> {
        self.parts.set_trust(id, trust)
    }

    /// Increases are scaled by the self-amplification factor.
    pub fn adjust_need_attention(&mut self, id: &PartId, delta: f64) -> Result<f64, ModelError> {
        self.parts
            .adjust_need_attention(id, delta, self.self_amplification)
    }

    pub fn set_need_attention(&mut self, id: &PartId, need: f64) -> Result<(), ModelError> {
        self.parts.set_need_attention(id, need)
    }

    pub fn reveal(&mut self, id: &PartId, field: BiographyField) -> Result<bool, ModelError> {
        self.parts.reveal(id, field)
    }

    pub fn mark_unburdened(&mut self, id: &PartId) -> Result<(), ModelError> {
        self.parts.mark_unburdened(id)
    }

    pub fn set_attacked(&mut self, id: &PartId, attacked: bool) -> Result<(), ModelError> {
        self.parts.set_attacked(id, attacked)
    }

    // --- Conference membership ---

    /// Makes `id` the only seated part. Clears blended, queued and
    /// supporting parts.
    pub fn set_target_cloud(&mut self, id: &PartId) {
        if !self.known(id) {
            return;
        }
        self.targets.clear();
        self.blended.clear();
        self.pending_blends.clear();
        self.supporting.clear();
        if self.self_ray.as_ref() != Some(id) {
            self.self_ray = None;
        }
        self.displaced.remove(id);
        self.clear_demand_for(id);
        self.targets.push(id.clone());
    }

    /// Seats `id` after the current targets. Removes it from any other role.
    pub fn add_target_cloud(&mut self, id: &PartId) {
        if !self.known(id) || self.is_target(id) {
            return;
        }
        self.leave_other_roles(id);
        self.targets.push(id.clone());
    }

    /// Unseats `id`, dropping its supporters and the self-ray if it pointed here.
    pub fn remove_target_cloud(&mut self, id: &PartId) {
        let Some(index) = self.targets.iter().position(|t| t == id) else {
            return;
        };
        self.targets.remove(index);
        self.supporting.remove(id);
        if self.self_ray.as_ref() == Some(id) {
            self.self_ray = None;
        }
    }

    /// Blends a part that is not seated. Seated parts are left alone; use
    /// `remove_target_cloud` first.
    pub fn add_blended_part(&mut self, id: &PartId, reason: BlendReason, degree: f64) {
        if !self.known(id) || self.is_target(id) {
            return;
        }
        self.leave_other_roles(id);
        self.blended.insert(
            id.clone(),
            BlendState {
                degree: degree.clamp(blend_constants::MIN_DEGREE, blend_constants::MAX_DEGREE),
                reason,
                separating: false,
            },
        );
    }

    pub fn set_blending_degree(&mut self, id: &PartId, degree: f64) -> bool {
        match self.blended.get_mut(id) {
            Some(state) => {
                state.degree =
                    degree.clamp(blend_constants::MIN_DEGREE, blend_constants::MAX_DEGREE);
                true
            }
            None => false,
        }
    }

    /// Marks a blended part as separating. Returns false if it was not
    /// blended or already separating.
    pub fn begin_separation(&mut self, id: &PartId) -> bool {
        match self.blended.get_mut(id) {
            Some(state) if !state.separating => {
                state.separating = true;
                true
            }
            _ => false,
        }
    }

    /// Moves a blended part to the end of the seating order.
    pub fn promote_blended_to_target(&mut self, id: &PartId) -> bool {
        if self.blended.remove(id).is_none() {
            return false;
        }
        self.targets.push(id.clone());
        true
    }

    /// Queues `id` to blend once it reaches the center. Returns false if it
    /// is already seated, blended or queued.
    pub fn enqueue_pending_blend(&mut self, id: &PartId, reason: BlendReason) -> bool {
        if !self.known(id) || self.is_target(id) || self.is_blended(id) || self.is_pending(id) {
            return false;
        }
        self.leave_other_roles(id);
        self.pending_blends.push_back(PendingBlend {
            part: id.clone(),
            reason,
        });
        true
    }

    pub fn dequeue_pending_blend(&mut self) -> Option<PendingBlend> {
        self.pending_blends.pop_front()
    }

    /// Removes a specific part from the queue.
    pub fn take_pending_blend(&mut self, id: &PartId) -> Option<PendingBlend> {
        let index = self.pending_blends.iter().position(|p| &p.part == id)?;
        self.pending_blends.remove(index)
    }

    /// The queued part has arrived at the center: blend it fully.
    pub fn complete_pending_blend(&mut self, id: &PartId) -> bool {
        match self.take_pending_blend(id) {
            Some(pending) => {
                self.add_blended_part(id, pending.reason, blend_constants::MAX_DEGREE);
                true
            }
            None => false,
        }
    }

    /// Seats `id` beside `target`. Returns false if `target` is not seated or
    /// `id` is seated, blended or queued.
    pub fn add_supporting_part(&mut self, target: &PartId, id: &PartId) -> bool {
        if !self.known(id)
            || id == target
            || !self.is_target(target)
            || self.is_target(id)
            || self.is_blended(id)
            || self.is_pending(id)
        {
            return false;
        }
        self.remove_supporting_part(id);
        self.displaced.remove(id);
        self.clear_demand_for(id);
        self.supporting
            .entry(target.clone())
            .or_default()
            .push(id.clone());
        true
    }

    pub fn remove_supporting_part(&mut self, id: &PartId) -> bool {
        let mut removed = false;
        for list in self.supporting.values_mut() {
            if let Some(index) = list.iter().position(|p| p == id) {
                list.remove(index);
                removed = true;
            }
        }
        self.supporting.retain(|_, list| !list.is_empty());
        removed
    }

    /// Points the self-ray at a seated part.
    pub fn set_self_ray(&mut self, target: &PartId) -> bool {
        if !self.is_target(target) {
            return false;
        }
        self.self_ray = Some(target.clone());
        true
    }

    pub fn clear_self_ray(&mut self) {
        self.self_ray = None;
    }

    pub fn clear_displaced(&mut self, id: &PartId) -> bool {
        self.displaced.remove(id)
    }

    pub fn set_pending_attention_demand(&mut self, id: Option<PartId>) {
        self.pending_attention_demand = id;
    }

    // --- Clock ---

    /// Advances the tick counter, elapsed time, and counts the timers down.
    pub fn advance_clock(&mut self, dt: f64) {
        self.tick += 1;
        self.elapsed += dt;
        let timers = &mut self.timers;
        timers.blend_cooldown = (timers.blend_cooldown - dt).max(0.0);
        timers.dialogue_cooldown = (timers.dialogue_cooldown - dt).max(0.0);
        timers.attention_check = (timers.attention_check - dt).max(0.0);
    }

    pub fn timers_mut(&mut self) -> &mut OrchestratorTimers {
        &mut self.timers
    }

    fn known(&self, id: &PartId) -> bool {
        if self.parts.contains(id) {
            true
        } else {
            tracing::debug!(part = %id, "ignoring membership change for unknown part");
            false
        }
    }

    /// Drops `id` from blended, pending and supporting roles, and from the
    /// displaced set since it is coming back in.
    fn leave_other_roles(&mut self, id: &PartId) {
        self.blended.remove(id);
        self.take_pending_blend(id);
        self.remove_supporting_part(id);
        self.displaced.remove(id);
        self.clear_demand_for(id);
    }

    fn clear_demand_for(&mut self, id: &PartId) {
        if self.pending_attention_demand.as_ref() == Some(id) {
            self.pending_attention_demand = None;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{model_with, pid};
    use super::*;

    #[test]
    fn test_proxy_flag_follows_relationships() {
        let mut model = model_with(&["critic", "planner"]);
        assert!(!model.is_proxy(&pid("planner")));

        model.relationships_mut().add_proxy("critic", "planner");
        assert!(model.is_proxy(&pid("planner")));
        assert!(!model.is_proxy(&pid("critic")));
    }

    #[test]
    fn test_set_target_cloud_is_exclusive() {
        let mut model = model_with(&["a", "b", "c", "d"]);
        model.add_target_cloud(&pid("a"));
        model.add_blended_part(&pid("b"), BlendReason::Spontaneous, 1.0);
        model.enqueue_pending_blend(&pid("c"), BlendReason::UserInitiated);

        model.set_target_cloud(&pid("d"));

        assert_eq!(model.targets(), &[pid("d")]);
        assert!(model.blended().is_empty());
        assert_eq!(model.pending_blends().count(), 0);
    }

    #[test]
    fn test_add_blended_part_ignores_targets() {
        let mut model = model_with(&["a"]);
        model.add_target_cloud(&pid("a"));
        model.add_blended_part(&pid("a"), BlendReason::Spontaneous, 1.0);

        assert!(model.is_target(&pid("a")));
        assert!(!model.is_blended(&pid("a")));
    }

    #[test]
    fn test_blending_degree_clamped() {
        let mut model = model_with(&["a"]);
        model.add_blended_part(&pid("a"), BlendReason::UserInitiated, 3.0);
        assert_eq!(model.blend_state(&pid("a")).unwrap().degree, 1.0);

        assert!(model.set_blending_degree(&pid("a"), -1.0));
        assert_eq!(model.blend_state(&pid("a")).unwrap().degree, 0.0);
        assert!(!model.set_blending_degree(&pid("missing"), 0.5));
    }

    #[test]
    fn test_add_target_removes_from_blended_and_pending() {
        let mut model = model_with(&["a", "b"]);
        model.add_blended_part(&pid("a"), BlendReason::Spontaneous, 1.0);
        model.enqueue_pending_blend(&pid("b"), BlendReason::Spontaneous);

        model.add_target_cloud(&pid("a"));
        model.add_target_cloud(&pid("b"));

        assert_eq!(model.targets(), &[pid("a"), pid("b")]);
        assert!(model.blended().is_empty());
        assert!(!model.is_pending(&pid("b")));
    }

    #[test]
    fn test_enqueue_rejects_members() {
        let mut model = model_with(&["a", "b"]);
        model.add_target_cloud(&pid("a"));

        assert!(!model.enqueue_pending_blend(&pid("a"), BlendReason::Spontaneous));
        assert!(model.enqueue_pending_blend(&pid("b"), BlendReason::Spontaneous));
        assert!(!model.enqueue_pending_blend(&pid("b"), BlendReason::UserInitiated));
        assert_eq!(model.pending_blends().count(), 1);
    }

    #[test]
    fn test_pending_queue_order() {
        let mut model = model_with(&["a", "b", "c"]);
        for id in ["a", "b", "c"] {
            model.enqueue_pending_blend(&pid(id), BlendReason::Spontaneous);
        }
        assert_eq!(model.take_pending_blend(&pid("b")).unwrap().part, pid("b"));
        assert_eq!(model.dequeue_pending_blend().unwrap().part, pid("a"));
        assert_eq!(model.dequeue_pending_blend().unwrap().part, pid("c"));
        assert!(model.dequeue_pending_blend().is_none());
    }

    #[test]
    fn test_complete_pending_blend() {
        let mut model = model_with(&["a"]);
        model.enqueue_pending_blend(&pid("a"), BlendReason::UserInitiated);

        assert!(model.complete_pending_blend(&pid("a")));
        let state = model.blend_state(&pid("a")).unwrap();
        assert_eq!(state.degree, 1.0);
        assert_eq!(state.reason, BlendReason::UserInitiated);
        assert!(!model.complete_pending_blend(&pid("a")));
    }

    #[test]
    fn test_supporting_parts_follow_their_target() {
        let mut model = model_with(&["lead", "helper"]);
        model.add_target_cloud(&pid("lead"));

        assert!(model.add_supporting_part(&pid("lead"), &pid("helper")));
        assert_eq!(model.supporting_target_of(&pid("helper")), Some(&pid("lead")));
        assert!(model.is_conferencing(&pid("helper")));

        model.remove_target_cloud(&pid("lead"));
        assert!(model.supporting_target_of(&pid("helper")).is_none());
    }

    #[test]
    fn test_supporting_requires_seated_target() {
        let mut model = model_with(&["lead", "helper"]);
        assert!(!model.add_supporting_part(&pid("lead"), &pid("helper")));
        model.add_target_cloud(&pid("lead"));
        assert!(!model.add_supporting_part(&pid("lead"), &pid("lead")));
    }

    #[test]
    fn test_self_ray_only_on_targets() {
        let mut model = model_with(&["a", "b"]);
        model.add_target_cloud(&pid("a"));

        assert!(!model.set_self_ray(&pid("b")));
        assert!(model.set_self_ray(&pid("a")));
        model.remove_target_cloud(&pid("a"));
        assert!(model.self_ray().is_none());
    }

    #[test]
    fn test_promote_blended_appends_seat() {
        let mut model = model_with(&["a", "b"]);
        model.add_target_cloud(&pid("a"));
        model.add_blended_part(&pid("b"), BlendReason::Spontaneous, 1.0);
        assert!(model.begin_separation(&pid("b")));
        assert!(!model.begin_separation(&pid("b")));

        assert!(model.promote_blended_to_target(&pid("b")));
        assert_eq!(model.targets(), &[pid("a"), pid("b")]);
    }

    #[test]
    fn test_unknown_parts_are_ignored() {
        let mut model = model_with(&["a"]);
        model.add_target_cloud(&pid("ghost"));
        model.set_target_cloud(&pid("ghost"));
        assert!(model.targets().is_empty());
    }

    #[test]
    fn test_advance_clock_counts_down() {
        let mut model = model_with(&[]);
        model.timers_mut().dialogue_cooldown = 0.05;
        model.advance_clock(0.1);

        assert_eq!(model.tick(), 1);
        assert_eq!(model.elapsed(), 0.1);
        assert_eq!(model.timers().dialogue_cooldown, 0.0);
    }

    #[test]
    fn test_model_json_round_trip() {
        let mut model = model_with(&["a", "b"]);
        model.relationships_mut().add_protection("a", "b");
        model.add_target_cloud(&pid("a"));
        model.advance_clock(1.0 / 60.0);

        let json = model.to_json().unwrap();
        let restored = SimulatorModel::from_json(json).unwrap();
        assert_eq!(restored, model);
    }
}
