//! In-process persistence backend

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{check_kind, Persistence, PersistenceError};
use crate::core::audit::AuditRecord;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::StoredRecord;

#[derive(Debug, Default)]
struct Tables {
    records: BTreeMap<EntityId, StoredRecord>,
    audit: Vec<AuditRecord>,
}

impl Tables {
    fn save(&mut self, kind: EntityKind, record: &StoredRecord) -> Result<u64, PersistenceError> {
        check_kind(kind, record)?;
        let found = self.records.get(record.id()).map_or(0, |r| r.version);
        if found != record.version {
            return Err(PersistenceError::VersionConflict {
                id: record.id().clone(),
                expected: record.version,
                found,
            });
        }

        let mut stored = record.clone();
        stored.version = found + 1;
        let version = stored.version;
        self.records.insert(stored.id().clone(), stored);
        Ok(version)
    }

    fn remove(&mut self, kind: EntityKind, id: &EntityId) -> bool {
        match self.records.get(id) {
            Some(r) if r.kind() == kind => self.records.remove(id).is_some(),
            _ => false,
        }
    }
}

/// Records and audit log held in memory
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    tables: Mutex<Tables>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>, PersistenceError> {
        self.tables.lock().map_err(|_| PersistenceError::Poisoned)
    }
}

impl Persistence for MemoryPersistence {
    fn load(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<StoredRecord>, PersistenceError> {
        let tables = self.tables()?;
        Ok(tables
            .records
            .get(id)
            .filter(|r| r.kind() == kind)
            .cloned())
    }

    fn save(&self, kind: EntityKind, record: &StoredRecord) -> Result<u64, PersistenceError> {
        self.tables()?.save(kind, record)
    }

    fn remove(&self, kind: EntityKind, id: &EntityId) -> Result<bool, PersistenceError> {
        Ok(self.tables()?.remove(kind, id))
    }

    fn scan(
        &self,
        kind: EntityKind,
        predicate: &dyn Fn(&StoredRecord) -> bool,
    ) -> Result<Vec<StoredRecord>, PersistenceError> {
        let tables = self.tables()?;
        Ok(tables
            .records
            .range(EntityId::lower_bound(kind)..)
            .take_while(|(id, _)| id.kind() == kind)
            .map(|(_, r)| r)
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    fn append(&self, audit: &AuditRecord) -> Result<(), PersistenceError> {
        self.tables()?.audit.push(audit.clone());
        Ok(())
    }

    fn commit(
        &self,
        kind: EntityKind,
        record: &StoredRecord,
        audit: &[AuditRecord],
    ) -> Result<u64, PersistenceError> {
        let mut tables = self.tables()?;
        let version = tables.save(kind, record)?;
        tables.audit.extend_from_slice(audit);
        Ok(version)
    }

    fn commit_removal(
        &self,
        kind: EntityKind,
        id: &EntityId,
        audit: &[AuditRecord],
    ) -> Result<bool, PersistenceError> {
        let mut tables = self.tables()?;
        let existed = tables.remove(kind, id);
        tables.audit.extend_from_slice(audit);
        Ok(existed)
    }

    fn audit_trail(&self, entity: Option<&EntityId>) -> Result<Vec<AuditRecord>, PersistenceError> {
        let tables = self.tables()?;
        Ok(tables
            .audit
            .iter()
            .filter(|a| entity.map_or(true, |id| a.entity == *id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_contract() {
        super::super::contract_tests::run_all(|| Box::new(MemoryPersistence::new()));
    }
}
