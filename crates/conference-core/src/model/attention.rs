//! Attention demands and victory.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use session_events::{BlendReason, PartId};

use super::{blend_constants, BlendState, SimulatorModel};
use crate::config::{AttentionConfig, VictoryConfig};
use crate::rng::TrackedRng;

/// A part that has crossed the attention threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionDemand {
    pub part: PartId,
    /// Urgent demands take over the conference immediately
    pub urgent: bool,
}

impl SimulatorModel {
    /// A protector is active until it has been unburdened.
    pub fn has_active_protector(&self, id: &PartId) -> bool {
        self.relationships.protectors_of(id).any(|protector| {
            self.parts
                .get(protector)
                .is_some_and(|p| !p.biography.is_unburdened())
        })
    }

    /// Picks the neediest eligible part above the base threshold.
    ///
    /// Parts guarded by an active protector are skipped, as are parts already
    /// in the conference while it is occupied. Only a candidate above the
    /// urgent threshold draws from `rng`, once.
    pub fn evaluate_attention_demand(
        &self,
        rng: &mut TrackedRng,
        config: &AttentionConfig,
    ) -> Option<AttentionDemand> {
        let occupied = self.conference_occupied();

        let mut candidates: Vec<_> = self.parts.iter().collect();
        candidates.sort_by(|a, b| {
            b.need_attention
                .partial_cmp(&a.need_attention)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        for part in candidates {
            if part.need_attention <= config.base_threshold {
                break;
            }
            if self.has_active_protector(&part.id) {
                continue;
            }
            if occupied && self.is_conferencing(&part.id) {
                continue;
            }
            let urgent = part.need_attention > config.urgent_threshold
                && rng.chance(config.urgent_chance, "attention_urgency");
            return Some(AttentionDemand {
                part: part.id.clone(),
                urgent,
            });
        }
        None
    }

    /// `id` takes over the conference. The displaced set becomes exactly the
    /// parts that were seated or blended, and `id` becomes the only, fully
    /// blended, part. Parts displaced by an earlier demand drop out of the
    /// set.
    pub fn part_demands_attention(&mut self, id: &PartId) {
        if !self.known(id) {
            return;
        }
        let previous: Vec<PartId> = self
            .targets
            .iter()
            .chain(self.blended.keys())
            .filter(|p| *p != id)
            .cloned()
            .collect();

        self.targets.clear();
        self.blended.clear();
        self.pending_blends.clear();
        self.supporting.clear();
        self.self_ray = None;
        self.pending_attention_demand = None;

        self.displaced = previous.into_iter().collect();
        self.blended.insert(
            id.clone(),
            BlendState {
                degree: blend_constants::MAX_DEGREE,
                reason: BlendReason::Spontaneous,
                separating: false,
            },
        );
        tracing::info!(part = %id, displaced = self.displaced.len(), "part demands attention");
    }

    /// Sets the victory flag when every part is trusting and calm and every
    /// protector has been unburdened. Returns
    /// true only on the tick the flag is first set.
    pub fn check_and_set_victory(&mut self, config: &VictoryConfig) -> bool {
        if self.victory || self.parts.is_empty() {
            return false;
        }
        let won = self.parts.iter().all(|p| {
            p.trust > config.min_trust
                && p.need_attention < config.max_need
                && (!self.relationships.is_protector(&p.id) || p.biography.is_unburdened())
        });
        if won {
            self.victory = true;
            tracing::info!(tick = self.tick, "victory");
        }
        won
    }
}
