//! Part State
//!
//! Per-part values (trust, attention need, biography) and the id-ordered
//! store that owns them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use session_events::{BiographyField, BiographyFlags, PartId};

use crate::error::ModelError;

/// Trust and attention bounds
pub mod part_constants {
    pub const DEFAULT_TRUST: f64 = 0.5;
    pub const MIN_TRUST: f64 = 0.0;
    pub const MAX_TRUST: f64 = 1.0;
    pub const MIN_NEED_ATTENTION: f64 = 0.0;
}

/// Biography content plus which of it has been revealed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Biography {
    #[serde(default)]
    pub flags: BiographyFlags,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub job_appraisal: Option<String>,
    #[serde(default)]
    pub job_impact: Option<String>,
}

impl Biography {
    pub fn content(&self, field: BiographyField) -> Option<&str> {
        let text = match field {
            BiographyField::Age => &self.age,
            BiographyField::Identity => &self.identity,
            BiographyField::Job => &self.job,
            BiographyField::JobAppraisal => &self.job_appraisal,
            BiographyField::JobImpact => &self.job_impact,
        };
        text.as_deref()
    }

    pub fn is_unburdened(&self) -> bool {
        self.flags.unburdened
    }
}

/// Lines a part can say. Which bank is used depends on whether the part has
/// been unburdened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueBank {
    #[serde(default)]
    pub job_appraisal: Vec<String>,
    #[serde(default)]
    pub job_impact: Vec<String>,
    #[serde(default)]
    pub unburdened_job_appraisal: Vec<String>,
    #[serde(default)]
    pub unburdened_job_impact: Vec<String>,
    /// Said when a grievance message lands
    #[serde(default)]
    pub reactions: Vec<String>,
}

impl DialogueBank {
    /// Candidate lines for a field. Empty for fields answered from the
    /// biography directly.
    pub fn lines_for(&self, field: BiographyField, unburdened: bool) -> &[String] {
        match (field, unburdened) {
            (BiographyField::JobAppraisal, false) => &self.job_appraisal,
            (BiographyField::JobAppraisal, true) => &self.unburdened_job_appraisal,
            (BiographyField::JobImpact, false) => &self.job_impact,
            (BiographyField::JobImpact, true) => &self.unburdened_job_impact,
            _ => &[],
        }
    }
}

/// Everything the model knows about one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartState {
    pub id: PartId,
    pub name: String,
    /// Trust toward self, 0.0 to 1.0
    pub trust: f64,
    /// How badly the part wants attention, never negative
    pub need_attention: f64,
    #[serde(default)]
    pub biography: Biography,
    #[serde(default)]
    pub dialogues: DialogueBank,
    /// Set when a grievance message lands, cleared by unburdening
    #[serde(default)]
    pub attacked: bool,
}

impl PartState {
    pub fn new(id: impl Into<PartId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trust: part_constants::DEFAULT_TRUST,
            need_attention: 0.0,
            biography: Biography::default(),
            dialogues: DialogueBank::default(),
            attacked: false,
        }
    }

    pub fn with_trust(mut self, trust: f64) -> Self {
        self.trust = trust.clamp(part_constants::MIN_TRUST, part_constants::MAX_TRUST);
        self
    }

    pub fn with_need_attention(mut self, need: f64) -> Self {
        self.need_attention = need.max(part_constants::MIN_NEED_ATTENTION);
        self
    }

    pub fn with_biography(mut self, biography: Biography) -> Self {
        self.biography = biography;
        self
    }

    pub fn with_dialogues(mut self, dialogues: DialogueBank) -> Self {
        self.dialogues = dialogues;
        self
    }
}

/// Id-ordered collection of every part in the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartStore {
    parts: BTreeMap<PartId, PartState>,
}

impl PartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, part: PartState) -> Result<(), ModelError> {
        if self.parts.contains_key(&part.id) {
            return Err(ModelError::DuplicatePart(part.id));
        }
        self.parts.insert(part.id.clone(), part);
        Ok(())
    }

    pub fn get(&self, id: &PartId) -> Option<&PartState> {
        self.parts.get(id)
    }

    pub fn require(&self, id: &PartId) -> Result<&PartState, ModelError> {
        self.parts
            .get(id)
            .ok_or_else(|| ModelError::UnknownPart(id.clone()))
    }

    fn require_mut(&mut self, id: &PartId) -> Result<&mut PartState, ModelError> {
        self.parts
            .get_mut(id)
            .ok_or_else(|| ModelError::UnknownPart(id.clone()))
    }

    pub fn contains(&self, id: &PartId) -> bool {
        self.parts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &PartId> {
        self.parts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartState> {
        self.parts.values()
    }

    /// Adds to trust, clamped to [0, 1]. Returns the new value.
    pub fn adjust_trust(&mut self, id: &PartId, delta: f64) -> Result<f64, ModelError> {
        let part = self.require_mut(id)?;
        part.trust = (part.trust + delta).clamp(part_constants::MIN_TRUST, part_constants::MAX_TRUST);
        Ok(part.trust)
    }

    pub fn set_trust(&mut self, id: &PartId, trust: f64) -> Result<(), ModelError> {
        let part = self.require_mut(id)?;
        part.trust = trust.clamp(part_constants::MIN_TRUST, part_constants::MAX_TRUST);
        Ok(())
    }

    /// Adds to attention need. Positive deltas are scaled by `multiplier`;
    /// the result never drops below zero. Returns the new value.
    pub fn adjust_need_attention(
        &mut self,
        id: &PartId,
        delta: f64,
        multiplier: f64,
    ) -> Result<f64, ModelError> {
        let part = self.require_mut(id)?;
        let scaled = if delta > 0.0 { delta * multiplier } else { delta };
        part.need_attention = (part.need_attention + scaled).max(part_constants::MIN_NEED_ATTENTION);
        Ok(part.need_attention)
    }

    pub fn set_need_attention(&mut self, id: &PartId, need: f64) -> Result<(), ModelError> {
        let part = self.require_mut(id)?;
        part.need_attention = need.max(part_constants::MIN_NEED_ATTENTION);
        Ok(())
    }

    /// Returns true if the field was hidden before.
    pub fn reveal(&mut self, id: &PartId, field: BiographyField) -> Result<bool, ModelError> {
        Ok(self.require_mut(id)?.biography.flags.reveal(field))
    }

    pub fn mark_unburdened(&mut self, id: &PartId) -> Result<(), ModelError> {
        self.require_mut(id)?.biography.flags.unburdened = true;
        Ok(())
    }

    pub fn set_attacked(&mut self, id: &PartId, attacked: bool) -> Result<(), ModelError> {
        self.require_mut(id)?.attacked = attacked;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(ids: &[&str]) -> PartStore {
        let mut store = PartStore::new();
        for id in ids {
            store.register(PartState::new(*id, id.to_uppercase())).unwrap();
        }
        store
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut store = store_with(&["critic"]);
        let err = store.register(PartState::new("critic", "Again")).unwrap_err();
        assert_eq!(err, ModelError::DuplicatePart(PartId::new("critic")));
    }

    #[test]
    fn test_ids_are_sorted() {
        let store = store_with(&["zeta", "alpha", "mid"]);
        let ids: Vec<&str> = store.ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_trust_is_clamped() {
        let mut store = store_with(&["critic"]);
        let id = PartId::new("critic");
        assert_eq!(store.adjust_trust(&id, 2.0).unwrap(), 1.0);
        assert_eq!(store.adjust_trust(&id, -5.0).unwrap(), 0.0);
    }

    #[test]
    fn test_need_attention_amplified_and_floored() {
        let mut store = store_with(&["exile"]);
        let id = PartId::new("exile");

        assert_eq!(store.adjust_need_attention(&id, 1.0, 2.0).unwrap(), 2.0);
        // Multiplier only applies to increases
        assert_eq!(store.adjust_need_attention(&id, -0.5, 2.0).unwrap(), 1.5);
        assert_eq!(store.adjust_need_attention(&id, -10.0, 2.0).unwrap(), 0.0);
    }

    #[test]
    fn test_unknown_part_errors() {
        let mut store = PartStore::new();
        let ghost = PartId::new("ghost");
        assert!(matches!(
            store.adjust_trust(&ghost, 0.1),
            Err(ModelError::UnknownPart(_))
        ));
    }

    #[test]
    fn test_dialogue_bank_switches_on_unburdened() {
        let bank = DialogueBank {
            job_impact: vec!["I keep you small".into()],
            unburdened_job_impact: vec!["I can rest now".into()],
            ..Default::default()
        };
        assert_eq!(bank.lines_for(BiographyField::JobImpact, false)[0], "I keep you small");
        assert_eq!(bank.lines_for(BiographyField::JobImpact, true)[0], "I can rest now");
        assert!(bank.lines_for(BiographyField::Age, false).is_empty());
    }
}
