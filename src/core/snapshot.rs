//! Point-in-time view of the whole catalog
//!
//! The store publishes a [`CatalogSnapshot`] behind an `Arc`; readers hold
//! their `Arc` for as long as they like and never observe later commits.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::core::entity::Entity;
use crate::core::graph::DependencyIndex;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::StoredRecord;

/// Every stored record plus the reverse-reference index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    records: BTreeMap<EntityId, StoredRecord>,
    index: DependencyIndex,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from loaded records
    pub fn from_records(records: impl IntoIterator<Item = StoredRecord>) -> Self {
        let mut snapshot = Self::new();
        for stored in records {
            snapshot.upsert(stored);
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&StoredRecord> {
        self.records.get(id)
    }

    /// Borrow an entity as its concrete type, retired or not
    pub fn entity<E: Entity>(&self, id: &EntityId) -> Option<&E> {
        self.records.get(id).and_then(StoredRecord::as_entity)
    }

    /// Borrow an entity only if it exists and is live
    pub fn live_entity<E: Entity>(&self, id: &EntityId) -> Option<&E> {
        self.records
            .get(id)
            .filter(|r| r.is_live())
            .and_then(StoredRecord::as_entity)
    }

    /// Whether the entity exists and is not retired
    pub fn is_live(&self, id: &EntityId) -> bool {
        self.records.get(id).is_some_and(StoredRecord::is_live)
    }

    /// All records of one kind in identity order
    pub fn iter_kind(&self, kind: EntityKind) -> impl Iterator<Item = &StoredRecord> + '_ {
        self.records
            .range(EntityId::lower_bound(kind)..)
            .take_while(move |(id, _)| id.kind() == kind)
            .map(|(_, r)| r)
    }

    /// Live entities of one type in identity order
    pub fn live<'a, E: Entity + 'a>(&'a self) -> impl Iterator<Item = &'a E> + 'a {
        self.iter_kind(E::KIND)
            .filter(|r| r.is_live())
            .filter_map(StoredRecord::as_entity)
    }

    /// The first record of `kind` strictly after `after` (or the first of
    /// the kind), for cursor-style iteration
    pub fn next_after(&self, kind: EntityKind, after: Option<&EntityId>) -> Option<&StoredRecord> {
        let start = match after {
            Some(id) => Bound::Excluded(id.clone()),
            None => Bound::Included(EntityId::lower_bound(kind)),
        };
        self.records
            .range((start, Bound::Unbounded))
            .next()
            .filter(|(id, _)| id.kind() == kind)
            .map(|(_, r)| r)
    }

    /// Records that directly reference `id`, live or retired
    pub fn referrers<'a>(&'a self, id: &EntityId) -> impl Iterator<Item = &'a StoredRecord> + 'a {
        self.index
            .referrers(id)
            .filter_map(move |source| self.records.get(source))
    }

    /// Live entities that depend on `id`, directly or transitively, sorted
    pub fn dependents(&self, id: &EntityId) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .index
            .trace_to(id, |source| self.is_live(source))
            .into_iter()
            .map(|(source, _)| source)
            .collect();
        found.sort();
        found
    }

    /// Insert or replace a record, keeping the index in step
    pub fn upsert(&mut self, stored: StoredRecord) {
        if let Some(previous) = self.records.get(stored.id()) {
            self.index.unlink(&previous.record);
        }
        self.index.link(&stored.record);
        self.records.insert(stored.id().clone(), stored);
    }

    /// Drop a record and its outgoing edges
    pub fn remove(&mut self, id: &EntityId) -> Option<StoredRecord> {
        let removed = self.records.remove(id)?;
        self.index.unlink(&removed.record);
        Some(removed)
    }
}
