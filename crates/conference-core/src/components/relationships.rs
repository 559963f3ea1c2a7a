//! Relationship Graph
//!
//! Directed relations between parts: protection (protector -> protected),
//! grievance (source -> target, carrying dialogue lines), and proxy
//! (source -> the part that answers for it).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use session_events::PartId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    /// protector -> parts it protects
    #[serde(default)]
    protections: BTreeMap<PartId, BTreeSet<PartId>>,
    /// source -> target -> lines the source says to the target
    #[serde(default)]
    grievances: BTreeMap<PartId, BTreeMap<PartId, Vec<String>>>,
    /// source -> parts that answer for it
    #[serde(default)]
    proxies: BTreeMap<PartId, BTreeSet<PartId>>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_protection(&mut self, protector: impl Into<PartId>, protected: impl Into<PartId>) {
        self.protections
            .entry(protector.into())
            .or_default()
            .insert(protected.into());
    }

    /// Adds a grievance, appending to any lines already present.
    pub fn add_grievance(
        &mut self,
        source: impl Into<PartId>,
        target: impl Into<PartId>,
        lines: impl IntoIterator<Item = String>,
    ) {
        self.grievances
            .entry(source.into())
            .or_default()
            .entry(target.into())
            .or_default()
            .extend(lines);
    }

    pub fn add_proxy(&mut self, source: impl Into<PartId>, proxy: impl Into<PartId>) {
        self.proxies
            .entry(source.into())
            .or_default()
            .insert(proxy.into());
    }

    /// Parts that protect `id`, in id order.
    pub fn protectors_of<'a>(&'a self, id: &'a PartId) -> impl Iterator<Item = &'a PartId> + 'a {
        self.protections
            .iter()
            .filter(move |(_, protected)| protected.contains(id))
            .map(|(protector, _)| protector)
    }

    pub fn protected_by(&self, protector: &PartId) -> impl Iterator<Item = &PartId> {
        self.protections.get(protector).into_iter().flatten()
    }

    pub fn is_protector(&self, id: &PartId) -> bool {
        self.protections.get(id).is_some_and(|set| !set.is_empty())
    }

    /// Targets `source` holds a grievance against, in id order.
    pub fn grievance_targets(&self, source: &PartId) -> impl Iterator<Item = &PartId> {
        self.grievances.get(source).into_iter().flat_map(|m| m.keys())
    }

    pub fn grievance_lines(&self, source: &PartId, target: &PartId) -> &[String] {
        self.grievances
            .get(source)
            .and_then(|m| m.get(target))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn proxies_of(&self, source: &PartId) -> impl Iterator<Item = &PartId> {
        self.proxies.get(source).into_iter().flatten()
    }

    /// True if `proxy` answers for `source`.
    pub fn proxy_for(&self, proxy: &PartId, source: &PartId) -> bool {
        self.proxies.get(source).is_some_and(|set| set.contains(proxy))
    }

    /// True if `id` answers for at least one other part.
    pub fn is_proxy(&self, id: &PartId) -> bool {
        self.proxies.values().any(|set| set.contains(id))
    }

    /// Every part id mentioned by any relation.
    pub fn referenced_ids(&self) -> BTreeSet<&PartId> {
        let mut ids = BTreeSet::new();
        for (protector, protected) in &self.protections {
            ids.insert(protector);
            ids.extend(protected.iter());
        }
        for (source, targets) in &self.grievances {
            ids.insert(source);
            ids.extend(targets.keys());
        }
        for (source, proxies) in &self.proxies {
            ids.insert(source);
            ids.extend(proxies.iter());
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_lookup_both_ways() {
        let mut rel = Relationships::new();
        rel.add_protection("critic", "exile");
        rel.add_protection("firefighter", "exile");

        let exile = PartId::new("exile");
        let protectors: Vec<&str> = rel.protectors_of(&exile).map(|p| p.as_str()).collect();
        assert_eq!(protectors, vec!["critic", "firefighter"]);
        assert!(rel.is_protector(&PartId::new("critic")));
        assert!(!rel.is_protector(&exile));
        assert_eq!(rel.protected_by(&PartId::new("critic")).count(), 1);
    }

    #[test]
    fn test_grievance_lines_accumulate() {
        let mut rel = Relationships::new();
        rel.add_grievance("a", "b", vec!["first".to_string()]);
        rel.add_grievance("a", "b", vec!["second".to_string()]);

        let lines = rel.grievance_lines(&PartId::new("a"), &PartId::new("b"));
        assert_eq!(lines, ["first", "second"]);
        assert!(rel.grievance_lines(&PartId::new("b"), &PartId::new("a")).is_empty());
    }

    #[test]
    fn test_proxy_relation() {
        let mut rel = Relationships::new();
        rel.add_proxy("critic", "planner");

        assert!(rel.proxy_for(&PartId::new("planner"), &PartId::new("critic")));
        assert!(!rel.proxy_for(&PartId::new("critic"), &PartId::new("planner")));
        assert!(rel.is_proxy(&PartId::new("planner")));
        assert!(!rel.is_proxy(&PartId::new("critic")));
        assert_eq!(rel.referenced_ids().len(), 2);
    }
}
