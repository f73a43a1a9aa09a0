use crate::models::EntityKind;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};

/// Counts every identity seen per entity kind and remembers which labels
/// produced duplicates.
#[derive(Debug, Default)]
pub struct DuplicateTracker {
    seen: FxHashMap<EntityKind, FxHashMap<String, u64>>,
    by_label: FxHashMap<EntityKind, FxHashMap<String, FxHashSet<String>>>,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one sighting. Returns `true` for the first occurrence of
    /// `(kind, identifier)`, `false` for every later one.
    pub fn observe(&mut self, kind: EntityKind, identifier: &str, label: &str) -> bool {
        let count = self
            .seen
            .entry(kind)
            .or_default()
            .entry(identifier.to_string())
            .or_insert(0);
        *count += 1;

        if *count > 1 {
            self.by_label
                .entry(kind)
                .or_default()
                .entry(label.to_string())
                .or_default()
                .insert(identifier.to_string());
            return false;
        }
        true
    }

    /// Times `identifier` has been seen for `kind`.
    pub fn count(&self, kind: EntityKind, identifier: &str) -> u64 {
        self.seen
            .get(&kind)
            .and_then(|m| m.get(identifier))
            .copied()
            .unwrap_or(0)
    }

    /// Identifiers seen at least twice.
    pub fn duplicates(&self, kind: EntityKind) -> BTreeSet<String> {
        self.duplicate_counts(kind).into_keys().collect()
    }

    /// Labels with at least one duplicate identifier.
    pub fn duplicate_labels(&self, kind: EntityKind) -> BTreeSet<String> {
        self.by_label
            .get(&kind)
            .map(|m| {
                m.iter()
                    .filter(|(_, ids)| !ids.is_empty())
                    .map(|(label, _)| label.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Excess sightings (count - 1) per duplicated identifier.
    pub fn duplicate_counts(&self, kind: EntityKind) -> BTreeMap<String, u64> {
        self.seen
            .get(&kind)
            .map(|m| {
                m.iter()
                    .filter(|&(_, &n)| n > 1)
                    .map(|(id, &n)| (id.clone(), n - 1))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn total_duplicates(&self) -> u64 {
        [EntityKind::Node, EntityKind::Edge]
            .iter()
            .map(|k| self.duplicate_counts(*k).values().sum::<u64>())
            .sum()
    }

    /// One clause per kind with duplicates, joined by "and"; `None` when there are none.
    pub fn report(&self) -> Option<String> {
        let clauses: Vec<String> = [EntityKind::Node, EntityKind::Edge]
            .iter()
            .filter_map(|kind| {
                let labels = self.duplicate_labels(*kind);
                if labels.is_empty() {
                    None
                } else {
                    Some(format!(
                        "for the following {kind} labels: {}",
                        labels.into_iter().collect::<Vec<_>>().join(", ")
                    ))
                }
            })
            .collect();

        if clauses.is_empty() {
            None
        } else {
            Some(format!(
                "Encountered duplicate identifiers {}",
                clauses.join(" and ")
            ))
        }
    }
}
