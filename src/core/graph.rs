//! Reverse-reference index over the catalog's foreign-key graph
//!
//! Edges run from a referencing entity to the entity it references
//! (Part -> Manufacturer, Certification -> Part, ...). The index stores them
//! reversed so that cascade checks can walk from a candidate for retirement
//! down to everything that depends on it.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::core::identity::EntityId;
use crate::core::record::Record;

/// Target id -> ids of the records that reference it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyIndex {
    referrers: BTreeMap<EntityId, BTreeSet<EntityId>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every outgoing reference of a record
    pub fn link(&mut self, record: &Record) {
        for reference in record.references() {
            self.referrers
                .entry(reference.target)
                .or_default()
                .insert(record.id().clone());
        }
    }

    /// Forget every outgoing reference of a record
    pub fn unlink(&mut self, record: &Record) {
        for reference in record.references() {
            if let Some(set) = self.referrers.get_mut(&reference.target) {
                set.remove(record.id());
                if set.is_empty() {
                    self.referrers.remove(&reference.target);
                }
            }
        }
    }

    /// Direct referrers of an entity, in id order
    pub fn referrers(&self, target: &EntityId) -> impl Iterator<Item = &EntityId> + '_ {
        self.referrers.get(target).into_iter().flatten()
    }

    /// Whether anything references the entity
    pub fn is_referenced(&self, target: &EntityId) -> bool {
        self.referrers.contains_key(target)
    }

    /// Walk backwards from `target` through referrers accepted by `follow`
    ///
    /// Returns each reached id with its depth (1 = direct referrer). Rejected
    /// referrers are neither reported nor traversed.
    pub fn trace_to(
        &self,
        target: &EntityId,
        follow: impl Fn(&EntityId) -> bool,
    ) -> Vec<(EntityId, usize)> {
        let mut results = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        queue.push_back((target.clone(), 0usize));
        visited.insert(target.clone());

        while let Some((current, depth)) = queue.pop_front() {
            for source in self.referrers(&current) {
                if visited.contains(source) || !follow(source) {
                    continue;
                }
                visited.insert(source.clone());
                results.push((source.clone(), depth + 1));
                queue.push_back((source.clone(), depth + 1));
            }
        }

        results
    }
}
