//! Persistence collaborator - the storage contract the catalog core consumes
//!
//! Backends hold stored records keyed by id and an append-only audit log.
//! `save` enforces version numbers: the caller passes the version it read
//! (0 for a new record) and receives the next one. The catalog core writes
//! through `commit` and `commit_removal`, which store a change together with
//! its audit records or not at all.

mod memory;
mod sqlite;

pub use memory::MemoryPersistence;
pub use sqlite::SqlitePersistence;

use thiserror::Error;

use crate::core::audit::AuditRecord;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::StoredRecord;

/// Errors raised by persistence backends
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("version conflict on {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: EntityId,
        expected: u64,
        found: u64,
    },

    #[error("record {id} is a {actual}, not a {requested}")]
    KindMismatch {
        id: EntityId,
        requested: EntityKind,
        actual: EntityKind,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Storage contract for the catalog core
pub trait Persistence: Send + Sync {
    /// Load one record, or None if absent
    fn load(&self, kind: EntityKind, id: &EntityId)
        -> Result<Option<StoredRecord>, PersistenceError>;

    /// Insert or replace a record; returns the new version
    ///
    /// `record.version` must equal the currently stored version (0 if new).
    fn save(&self, kind: EntityKind, record: &StoredRecord) -> Result<u64, PersistenceError>;

    /// Physically remove a record; returns whether it existed
    fn remove(&self, kind: EntityKind, id: &EntityId) -> Result<bool, PersistenceError>;

    /// All records of a kind matching the predicate, ordered by id
    fn scan(
        &self,
        kind: EntityKind,
        predicate: &dyn Fn(&StoredRecord) -> bool,
    ) -> Result<Vec<StoredRecord>, PersistenceError>;

    /// Append one audit record
    fn append(&self, audit: &AuditRecord) -> Result<(), PersistenceError>;

    /// Save a record and append its audit records as one unit
    ///
    /// Same version rules as `save`. On error neither the record nor any
    /// audit record is written.
    fn commit(
        &self,
        kind: EntityKind,
        record: &StoredRecord,
        audit: &[AuditRecord],
    ) -> Result<u64, PersistenceError>;

    /// Remove a record and append its audit records as one unit
    fn commit_removal(
        &self,
        kind: EntityKind,
        id: &EntityId,
        audit: &[AuditRecord],
    ) -> Result<bool, PersistenceError>;

    /// Audit records in append order, optionally for one entity
    fn audit_trail(&self, entity: Option<&EntityId>) -> Result<Vec<AuditRecord>, PersistenceError>;
}

fn check_kind(kind: EntityKind, record: &StoredRecord) -> Result<(), PersistenceError> {
    if record.kind() != kind {
        return Err(PersistenceError::KindMismatch {
            id: record.id().clone(),
            requested: kind,
            actual: record.kind(),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod contract_tests {
    //! Behaviour every backend must share

    use super::*;
    use crate::core::entity::FinancialHealth;
    use crate::entities::{Manufacturer, Part};
    use chrono::Utc;
    use serde_json::Value;

    pub fn save_assigns_versions(p: &dyn Persistence) {
        let mfr = Manufacturer::new("BAE Systems", FinancialHealth::A);
        let id = mfr.id.clone();
        let mut stored = StoredRecord::new(mfr.into());

        stored.version = p.save(EntityKind::Manufacturer, &stored).unwrap();
        assert_eq!(stored.version, 1);
        stored.version = p.save(EntityKind::Manufacturer, &stored).unwrap();
        assert_eq!(stored.version, 2);

        let loaded = p.load(EntityKind::Manufacturer, &id).unwrap().unwrap();
        assert_eq!(loaded, stored);
    }

    pub fn stale_save_conflicts(p: &dyn Persistence) {
        let stored = StoredRecord::new(Manufacturer::new("Cummins", FinancialHealth::B).into());
        p.save(EntityKind::Manufacturer, &stored).unwrap();
        // Still claims version 0
        let err = p.save(EntityKind::Manufacturer, &stored).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::VersionConflict { expected: 0, found: 1, .. }
        ));
    }

    pub fn kind_is_checked(p: &dyn Persistence) {
        let stored = StoredRecord::new(Manufacturer::new("Caterpillar", FinancialHealth::A).into());
        let err = p.save(EntityKind::Part, &stored).unwrap_err();
        assert!(matches!(err, PersistenceError::KindMismatch { .. }));

        p.save(EntityKind::Manufacturer, &stored).unwrap();
        assert!(p.load(EntityKind::Part, stored.id()).unwrap().is_none());
    }

    pub fn scan_filters_and_orders(p: &dyn Persistence) {
        let mfr = EntityId::new(EntityKind::Manufacturer);
        let mut ids = Vec::new();
        for (model, stock) in [("A", 1), ("B", 20), ("C", 3)] {
            let part = Part::new(model, mfr.clone()).with_stock(stock, 5);
            ids.push(part.id.clone());
            p.save(EntityKind::Part, &StoredRecord::new(part.into())).unwrap();
        }
        ids.sort();

        let all = p.scan(EntityKind::Part, &|_| true).unwrap();
        let scanned: Vec<_> = all.iter().map(|r| r.id().clone()).collect();
        assert_eq!(scanned, ids);

        let low = p
            .scan(EntityKind::Part, &|r| {
                r.as_entity::<Part>().is_some_and(|part| part.stock_level < 5)
            })
            .unwrap();
        assert_eq!(low.len(), 2);
        assert!(p.scan(EntityKind::Module, &|_| true).unwrap().is_empty());
    }

    pub fn remove_deletes(p: &dyn Persistence) {
        let stored = StoredRecord::new(Manufacturer::new("Navistar", FinancialHealth::C).into());
        p.save(EntityKind::Manufacturer, &stored).unwrap();
        assert!(p.remove(EntityKind::Manufacturer, stored.id()).unwrap());
        assert!(!p.remove(EntityKind::Manufacturer, stored.id()).unwrap());
        assert!(p.load(EntityKind::Manufacturer, stored.id()).unwrap().is_none());
    }

    pub fn audit_appends_in_order(p: &dyn Persistence) {
        let a = EntityId::new(EntityKind::Part);
        let b = EntityId::new(EntityKind::Part);
        let now = Utc::now();
        p.append(&AuditRecord::new(&a, "stock_level", Value::from(1), Value::from(2), now))
            .unwrap();
        p.append(&AuditRecord::new(&b, "model", Value::Null, Value::from("X"), now))
            .unwrap();
        p.append(&AuditRecord::new(&a, "stock_level", Value::from(2), Value::from(0), now))
            .unwrap();

        let all = p.audit_trail(None).unwrap();
        assert_eq!(all.len(), 3);
        let for_a = p.audit_trail(Some(&a)).unwrap();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[1].new_value, Value::from(0));
    }

    pub fn commit_writes_record_and_audit(p: &dyn Persistence) {
        let mfr = Manufacturer::new("General Dynamics", FinancialHealth::A);
        let id = mfr.id.clone();
        let stored = StoredRecord::new(mfr.into());
        let now = Utc::now();
        let created = [AuditRecord::new(&id, "name", Value::Null, Value::from("General Dynamics"), now)];

        assert_eq!(p.commit(EntityKind::Manufacturer, &stored, &created).unwrap(), 1);
        let trail = p.audit_trail(Some(&id)).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].new_value, Value::from("General Dynamics"));

        let removed = [AuditRecord::new(&id, "record", Value::from("body"), Value::Null, now)];
        assert!(p.commit_removal(EntityKind::Manufacturer, &id, &removed).unwrap());
        assert!(p.load(EntityKind::Manufacturer, &id).unwrap().is_none());
        assert_eq!(p.audit_trail(Some(&id)).unwrap().len(), 2);
    }

    pub fn failed_commit_appends_nothing(p: &dyn Persistence) {
        let stored = StoredRecord::new(Manufacturer::new("Rheinmetall", FinancialHealth::B).into());
        let id = stored.id().clone();
        p.save(EntityKind::Manufacturer, &stored).unwrap();

        // Stale version: the commit fails and must leave no audit behind
        let change = [AuditRecord::new(&id, "name", Value::from("a"), Value::from("b"), Utc::now())];
        let err = p.commit(EntityKind::Manufacturer, &stored, &change).unwrap_err();
        assert!(matches!(err, PersistenceError::VersionConflict { .. }));
        assert!(p.audit_trail(Some(&id)).unwrap().is_empty());
        assert_eq!(p.load(EntityKind::Manufacturer, &id).unwrap().unwrap().version, 1);

        let err = p.commit(EntityKind::Part, &stored, &change).unwrap_err();
        assert!(matches!(err, PersistenceError::KindMismatch { .. }));
        assert!(p.audit_trail(None).unwrap().is_empty());
    }

    pub fn run_all(make: impl Fn() -> Box<dyn Persistence>) {
        save_assigns_versions(make().as_ref());
        stale_save_conflicts(make().as_ref());
        kind_is_checked(make().as_ref());
        scan_filters_and_orders(make().as_ref());
        remove_deletes(make().as_ref());
        audit_appends_in_order(make().as_ref());
        commit_writes_record_and_audit(make().as_ref());
        failed_commit_appends_nothing(make().as_ref());
    }
}
