//! Snapshot Types
//!
//! Serialization structs for model state as seen from outside the model.
//!
//! Two kinds of snapshot exist. [`ModelSnapshot`] is the per-tick view handed to
//! renderers. [`VerificationSnapshot`] is the oracle stored with every recorded
//! action; it is never used as replay input, only compared against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{BiographyField, BlendReason, PartId};

/// Which biography facts a part has revealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiographyFlags {
    #[serde(default)]
    pub age: bool,
    #[serde(default)]
    pub identity: bool,
    #[serde(default)]
    pub job: bool,
    #[serde(default)]
    pub job_appraisal: bool,
    #[serde(default)]
    pub job_impact: bool,
    #[serde(default)]
    pub unburdened: bool,
}

impl BiographyFlags {
    pub fn is_revealed(&self, field: BiographyField) -> bool {
        match field {
            BiographyField::Age => self.age,
            BiographyField::Identity => self.identity,
            BiographyField::Job => self.job,
            BiographyField::JobAppraisal => self.job_appraisal,
            BiographyField::JobImpact => self.job_impact,
        }
    }

    /// Marks a field revealed. Returns true if it was hidden before.
    pub fn reveal(&mut self, field: BiographyField) -> bool {
        let slot = match field {
            BiographyField::Age => &mut self.age,
            BiographyField::Identity => &mut self.identity,
            BiographyField::Job => &mut self.job,
            BiographyField::JobAppraisal => &mut self.job_appraisal,
            BiographyField::JobImpact => &mut self.job_impact,
        };
        let was_hidden = !*slot;
        *slot = true;
        was_hidden
    }

    /// Names of flags that differ between two flag sets.
    pub fn differences(&self, other: &BiographyFlags) -> Vec<&'static str> {
        let mut out = Vec::new();
        for field in BiographyField::ALL {
            if self.is_revealed(field) != other.is_revealed(field) {
                out.push(field.as_str());
            }
        }
        if self.unburdened != other.unburdened {
            out.push("unburdened");
        }
        out
    }
}

/// Orchestrator countdown timers, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorTimers {
    pub blend_cooldown: f64,
    pub dialogue_cooldown: f64,
    pub attention_check: f64,
}

/// Number of draws taken from each RNG stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngCounts {
    pub model: u64,
    pub cosmetic: u64,
}

/// Per-part values checked during playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartVerification {
    pub trust: f64,
    pub need_attention: f64,
    pub biography: BiographyFlags,
}

/// Verification-only snapshot stored with every recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSnapshot {
    pub tick: u64,
    pub targets: Vec<PartId>,
    pub blended: Vec<PartId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<PartId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_ray: Option<PartId>,
    pub parts: BTreeMap<PartId, PartVerification>,
    pub timers: OrchestratorTimers,
}

/// A blended part as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendSnapshot {
    pub part: PartId,
    pub degree: f64,
    pub reason: BlendReason,
    #[serde(default)]
    pub separating: bool,
}

/// A queued blend waiting for its turn at the center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSnapshot {
    pub part: PartId,
    pub reason: BlendReason,
}

/// An in-flight message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub id: u64,
    pub sender: PartId,
    pub target: PartId,
    pub text: String,
    /// 0.0 at send, 1.0 on arrival
    pub progress: f64,
}

/// A thought bubble shown next to a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleSnapshot {
    pub id: u64,
    pub part: PartId,
    pub text: String,
    pub expires_at: f64,
}

/// Everything a renderer needs from the model for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub tick: u64,
    pub elapsed: f64,
    /// Every registered part, in id order
    pub parts: Vec<PartId>,
    /// Seated parts in seating order
    pub targets: Vec<PartId>,
    pub blended: Vec<BlendSnapshot>,
    pub pending: Vec<PendingSnapshot>,
    #[serde(default)]
    pub supporting: BTreeMap<PartId, Vec<PartId>>,
    #[serde(default)]
    pub self_ray: Option<PartId>,
    #[serde(default)]
    pub messages: Vec<MessageSnapshot>,
    #[serde(default)]
    pub bubbles: Vec<BubbleSnapshot>,
    #[serde(default)]
    pub displaced: Vec<PartId>,
    #[serde(default)]
    pub victory: bool,
}

impl ModelSnapshot {
    /// True if the part is seated, blended, queued or supporting.
    pub fn is_conferencing(&self, id: &PartId) -> bool {
        self.targets.contains(id)
            || self.blended.iter().any(|b| &b.part == id)
            || self.pending.iter().any(|p| &p.part == id)
            || self.supporting_target_of(id).is_some()
    }

    /// The target a supporting part is attached to, with its index.
    pub fn supporting_target_of(&self, id: &PartId) -> Option<(&PartId, usize)> {
        self.supporting.iter().find_map(|(target, list)| {
            list.iter().position(|p| p == id).map(|index| (target, index))
        })
    }

    pub fn blend(&self, id: &PartId) -> Option<&BlendSnapshot> {
        self.blended.iter().find(|b| &b.part == id)
    }

    pub fn seat_index(&self, id: &PartId) -> Option<usize> {
        self.targets.iter().position(|t| t == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_reports_first_reveal() {
        let mut flags = BiographyFlags::default();
        assert!(flags.reveal(BiographyField::Job));
        assert!(!flags.reveal(BiographyField::Job));
        assert!(flags.is_revealed(BiographyField::Job));
        assert!(!flags.is_revealed(BiographyField::Age));
    }

    #[test]
    fn test_flag_differences() {
        let a = BiographyFlags::default();
        let mut b = BiographyFlags::default();
        b.age = true;
        b.unburdened = true;

        assert_eq!(a.differences(&b), vec!["age", "unburdened"]);
        assert!(a.differences(&a).is_empty());
    }

    #[test]
    fn test_snapshot_membership_helpers() {
        let mut snapshot = ModelSnapshot {
            targets: vec![PartId::new("a"), PartId::new("b")],
            ..Default::default()
        };
        snapshot
            .supporting
            .insert(PartId::new("a"), vec![PartId::new("helper")]);

        assert_eq!(snapshot.seat_index(&PartId::new("b")), Some(1));
        assert!(snapshot.is_conferencing(&PartId::new("helper")));
        assert_eq!(
            snapshot.supporting_target_of(&PartId::new("helper")),
            Some((&PartId::new("a"), 0))
        );
        assert!(!snapshot.is_conferencing(&PartId::new("stranger")));
    }
}
