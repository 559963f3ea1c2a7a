//! Conversions from the model to the outward-facing snapshot types.

use session_events::{
    BlendSnapshot, BubbleSnapshot, MessageSnapshot, ModelSnapshot, PartVerification,
    PendingSnapshot, VerificationSnapshot,
};

use super::SimulatorModel;

impl SimulatorModel {
    /// Per-tick state for renderers.
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            tick: self.tick,
            elapsed: self.elapsed,
            parts: self.parts.ids().cloned().collect(),
            targets: self.targets.clone(),
            blended: self
                .blended
                .iter()
                .map(|(part, state)| BlendSnapshot {
                    part: part.clone(),
                    degree: state.degree,
                    reason: state.reason,
                    separating: state.separating,
                })
                .collect(),
            pending: self
                .pending_blends
                .iter()
                .map(|p| PendingSnapshot {
                    part: p.part.clone(),
                    reason: p.reason,
                })
                .collect(),
            supporting: self.supporting.clone(),
            self_ray: self.self_ray.clone(),
            messages: self
                .messages
                .iter()
                .map(|m| MessageSnapshot {
                    id: m.id,
                    sender: m.sender.clone(),
                    target: m.target.clone(),
                    text: m.text.clone(),
                    progress: m.progress(),
                })
                .collect(),
            bubbles: self
                .thought_bubbles
                .iter()
                .map(|b| BubbleSnapshot {
                    id: b.id,
                    part: b.part.clone(),
                    text: b.text.clone(),
                    expires_at: b.expires_at,
                })
                .collect(),
            displaced: self.displaced.iter().cloned().collect(),
            victory: self.victory,
        }
    }

    /// The oracle stored alongside each recorded action.
    pub fn verification_snapshot(&self) -> VerificationSnapshot {
        VerificationSnapshot {
            tick: self.tick,
            targets: self.targets.clone(),
            blended: self.blended.keys().cloned().collect(),
            pending: self.pending_blends.iter().map(|p| p.part.clone()).collect(),
            self_ray: self.self_ray.clone(),
            parts: self
                .parts
                .iter()
                .map(|p| {
                    (
                        p.id.clone(),
                        PartVerification {
                            trust: p.trust,
                            need_attention: p.need_attention,
                            biography: p.biography.flags,
                        },
                    )
                })
                .collect(),
            timers: self.timers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{model_with, pid};
    use session_events::BlendReason;

    #[test]
    fn test_snapshot_reflects_membership() {
        let mut model = model_with(&["a", "b", "c"]);
        model.add_target_cloud(&pid("a"));
        model.add_blended_part(&pid("b"), BlendReason::Spontaneous, 0.4);
        model.enqueue_pending_blend(&pid("c"), BlendReason::UserInitiated);
        model.set_self_ray(&pid("a"));

        let snapshot = model.snapshot();
        assert_eq!(snapshot.parts.len(), 3);
        assert_eq!(snapshot.targets, vec![pid("a")]);
        assert_eq!(snapshot.blend(&pid("b")).unwrap().degree, 0.4);
        assert_eq!(snapshot.pending[0].part, pid("c"));
        assert_eq!(snapshot.self_ray, Some(pid("a")));
    }

    #[test]
    fn test_verification_snapshot_carries_part_values() {
        let mut model = model_with(&["a"]);
        model.set_trust(&pid("a"), 0.75).unwrap();
        let snapshot = model.verification_snapshot();
        assert_eq!(snapshot.parts[&pid("a")].trust, 0.75);
    }
}
