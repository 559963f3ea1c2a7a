//! Structural invariant checks.

use std::collections::BTreeMap;

use session_events::PartId;

use super::SimulatorModel;

/// A broken structural invariant, found by [`SimulatorModel::check_invariants`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{part} is in more than one conference role: {roles:?}")]
    MultipleRoles {
        part: PartId,
        roles: Vec<&'static str>,
    },
    #[error("{0} is referenced but not registered")]
    UnknownPart(PartId),
    #[error("self-ray points at {0}, which is not seated")]
    SelfRayOffTarget(PartId),
    #[error("{supporter} supports {target}, which is not seated")]
    SupportingUnseated { supporter: PartId, target: PartId },
    #[error("{0} is displaced while still in the conference")]
    DisplacedMember(PartId),
    #[error("trust of {part} is out of range: {value}")]
    TrustOutOfRange { part: PartId, value: f64 },
    #[error("attention need of {part} is negative: {value}")]
    NegativeNeed { part: PartId, value: f64 },
}

impl SimulatorModel {
    /// Checks membership exclusivity, references, and value ranges.
    /// Reports the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut roles: BTreeMap<&PartId, Vec<&'static str>> = BTreeMap::new();
        for id in &self.targets {
            roles.entry(id).or_default().push("target");
        }
        for id in self.blended.keys() {
            roles.entry(id).or_default().push("blended");
        }
        for pending in &self.pending_blends {
            roles.entry(&pending.part).or_default().push("pending");
        }
        for list in self.supporting.values() {
            for id in list {
                roles.entry(id).or_default().push("supporting");
            }
        }

        for (id, held) in &roles {
            if !self.parts.contains(id) {
                return Err(InvariantViolation::UnknownPart((*id).clone()));
            }
            if held.len() > 1 {
                return Err(InvariantViolation::MultipleRoles {
                    part: (*id).clone(),
                    roles: held.clone(),
                });
            }
        }

        for (target, list) in &self.supporting {
            if !self.targets.contains(target) {
                if let Some(supporter) = list.first() {
                    return Err(InvariantViolation::SupportingUnseated {
                        supporter: supporter.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        if let Some(ray) = &self.self_ray {
            if !self.targets.contains(ray) {
                return Err(InvariantViolation::SelfRayOffTarget(ray.clone()));
            }
        }

        for id in &self.displaced {
            if roles.contains_key(id) {
                return Err(InvariantViolation::DisplacedMember(id.clone()));
            }
        }

        for id in self.relationships.referenced_ids() {
            if !self.parts.contains(id) {
                return Err(InvariantViolation::UnknownPart(id.clone()));
            }
        }

        for part in self.parts.iter() {
            if !(0.0..=1.0).contains(&part.trust) {
                return Err(InvariantViolation::TrustOutOfRange {
                    part: part.id.clone(),
                    value: part.trust,
                });
            }
            if part.need_attention < 0.0 {
                return Err(InvariantViolation::NegativeNeed {
                    part: part.id.clone(),
                    value: part.need_attention,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{model_with, pid};
    use super::*;
    use session_events::BlendReason;

    #[test]
    fn test_fresh_model_is_valid() {
        let mut model = model_with(&["a", "b", "c"]);
        model.add_target_cloud(&pid("a"));
        model.add_supporting_part(&pid("a"), &pid("b"));
        model.enqueue_pending_blend(&pid("c"), BlendReason::Spontaneous);
        assert_eq!(model.check_invariants(), Ok(()));
    }

    #[test]
    fn test_detects_double_membership_in_loaded_state() {
        let mut model = model_with(&["a"]);
        model.add_target_cloud(&pid("a"));
        let mut json = model.to_json().unwrap();
        json["blended"] = serde_json::json!({
            "a": { "degree": 1.0, "reason": "spontaneous" }
        });

        let broken = SimulatorModel::from_json(json).unwrap();
        assert!(matches!(
            broken.check_invariants(),
            Err(InvariantViolation::MultipleRoles { .. })
        ));
    }

    #[test]
    fn test_detects_dangling_relationship() {
        let mut model = model_with(&["a"]);
        model.relationships_mut().add_protection("a", "ghost");
        assert_eq!(
            model.check_invariants(),
            Err(InvariantViolation::UnknownPart(pid("ghost")))
        );
    }
}
