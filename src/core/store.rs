//! Catalog store - create/read/update/retire keyed by entity identity
//!
//! Every mutation follows the same commit path:
//!
//! 1. take the per-entity locks it needs (bounded wait, `Busy` on timeout)
//! 2. validate the candidate against the current snapshot
//! 3. commit the record and its field-level audit records through the
//!    persistence collaborator in one unit (optimistic version check)
//! 4. publish the change into a new snapshot (copy-on-write)
//!
//! A failed commit leaves both storage and the published snapshot unchanged.
//!
//! Retirement is a soft delete; `purge` is the only physical delete and
//! refuses while any row, live or retired, still references the target.
//!
//! Readers clone the published `Arc` and never see a half-applied change.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::NaiveDate;
use ulid::Generator;

use crate::core::audit::{self, AuditRecord};
use crate::core::clock::{Clock, SystemClock};
use crate::core::entity::Entity;
use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::locks::{LockKey, LockTable};
use crate::core::persistence::Persistence;
use crate::core::record::{Patch, Record, StoredRecord};
use crate::core::snapshot::CatalogSnapshot;
use crate::core::validator::{expect_kind, Validator};

/// Default bounded wait for entity locks
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Tunables for a store instance
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// What `retire` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireOutcome {
    /// Marked retired
    Retired,
    /// It was already retired
    Unchanged,
}

/// The catalog's single logical owner
pub struct CatalogStore<P: Persistence, C: Clock = SystemClock> {
    persistence: P,
    clock: C,
    published: RwLock<Arc<CatalogSnapshot>>,
    locks: LockTable,
    ids: Mutex<Generator>,
}

impl<P: Persistence, C: Clock> std::fmt::Debug for CatalogStore<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("entities", &self.snapshot().len())
            .field("lock_timeout", &self.locks.timeout())
            .finish_non_exhaustive()
    }
}

/// Keys a mutation of `record` must hold
fn lock_keys(record: &Record) -> Vec<LockKey> {
    let mut keys = vec![LockKey::Entity(record.id().clone())];
    keys.extend(
        record
            .references()
            .into_iter()
            .map(|r| LockKey::Entity(r.target)),
    );
    if let Record::CrossReference(xref) = record {
        keys.push(LockKey::Sourcing {
            part: xref.part.clone(),
            manufacturer: xref.manufacturer.clone(),
        });
    }
    keys
}

fn log_rejection(op: &str, id: &EntityId, err: &CatalogError) {
    match err {
        CatalogError::DanglingReference { .. } | CatalogError::ConflictingContract { .. } => {
            tracing::warn!(op, id = %id, error = %err, "mutation rejected");
        }
        _ => tracing::debug!(op, id = %id, error = %err, "mutation rejected"),
    }
}

impl<P: Persistence, C: Clock> CatalogStore<P, C> {
    /// Open a store over a persistence backend, loading every record
    pub fn open(persistence: P, clock: C, options: StoreOptions) -> Result<Self, CatalogError> {
        let mut records = Vec::new();
        for kind in EntityKind::all() {
            records.extend(persistence.scan(*kind, &|_| true)?);
        }
        let snapshot = CatalogSnapshot::from_records(records);
        tracing::debug!(entities = snapshot.len(), "catalog loaded");

        Ok(Self {
            persistence,
            clock,
            published: RwLock::new(Arc::new(snapshot)),
            locks: LockTable::new(options.lock_timeout),
            ids: Mutex::new(Generator::new()),
        })
    }

    /// The current published snapshot
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let guard = self.published.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn next_id(&self, kind: EntityKind) -> Result<EntityId, CatalogError> {
        let mut generator = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        let ulid = generator.generate().map_err(|e| CatalogError::Busy {
            id: None,
            reason: format!("cannot allocate identity: {}", e),
        })?;
        Ok(EntityId::from_parts(kind, ulid))
    }

    fn publish(&self, change: impl FnOnce(&mut CatalogSnapshot)) {
        let mut guard = self.published.write().unwrap_or_else(PoisonError::into_inner);
        change(Arc::make_mut(&mut guard));
    }

    fn commit(&self, stored: &StoredRecord, changes: &[AuditRecord]) -> Result<u64, CatalogError> {
        self.persistence
            .commit(stored.kind(), stored, changes)
            .map_err(|e| {
                tracing::error!(id = %stored.id(), error = %e, "commit failed");
                CatalogError::from(e)
            })
    }

    // =========================================================================
    // Create / read
    // =========================================================================

    /// Create an entity, assigning it a fresh identity
    pub fn create<E: Entity>(&self, entity: E) -> Result<EntityId, CatalogError> {
        self.create_record(entity.into())
    }

    /// Create from an untyped record; the record's id is replaced
    pub fn create_record(&self, mut record: Record) -> Result<EntityId, CatalogError> {
        let kind = record.kind();
        let id = self.next_id(kind)?;
        record.set_id(id.clone());

        let _guard = self.locks.acquire(lock_keys(&record))?;
        let snapshot = self.snapshot();
        Validator::new(&snapshot, self.clock.today())
            .check(&record)
            .inspect_err(|e| log_rejection("create", &id, e))?;

        let now = self.clock.now();
        let changes = audit::created(&record, now)?;
        let mut stored = StoredRecord::new(record);
        stored.version = self.commit(&stored, &changes)?;
        tracing::debug!(id = %id, kind = %kind, version = stored.version, "created");

        self.publish(|s| s.upsert(stored));
        Ok(id)
    }

    /// Fetch a stored record (live or retired)
    pub fn get(&self, id: &EntityId) -> Result<StoredRecord, CatalogError> {
        self.snapshot()
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    /// Fetch an entity as its concrete type
    pub fn get_as<E: Entity>(&self, id: &EntityId) -> Result<E, CatalogError> {
        expect_kind::<E>(id)?;
        self.snapshot()
            .entity::<E>(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Apply a partial update; returns the committed version
    pub fn update(&self, id: &EntityId, patch: &Patch) -> Result<u64, CatalogError> {
        self.mutate("update", id, None, |record| patch.apply(record))
            .map(|s| s.version)
    }

    /// Apply a partial update only if the entity is still at `expected_version`
    pub fn update_versioned(
        &self,
        id: &EntityId,
        expected_version: u64,
        patch: &Patch,
    ) -> Result<u64, CatalogError> {
        self.mutate("update", id, Some(expected_version), |record| {
            patch.apply(record)
        })
        .map(|s| s.version)
    }

    /// Move stock on a part or module; returns the new level
    ///
    /// A positive delta with a receipt date also records the receipt.
    pub fn adjust_stock(
        &self,
        id: &EntityId,
        delta: i64,
        received_on: Option<NaiveDate>,
    ) -> Result<i64, CatalogError> {
        let mut level = 0;
        self.mutate("adjust_stock", id, None, |record| {
            let mut record = record.clone();
            let (field, stock, last_received) = match &mut record {
                Record::Part(p) => ("stock_level", &mut p.stock_level, &mut p.last_received),
                Record::Module(m) => ("stock_count", &mut m.stock_count, &mut m.last_received),
                other => {
                    return Err(CatalogError::validation(
                        Some(other.id()),
                        "id",
                        "stock adjustments apply to parts and modules",
                    ))
                }
            };

            let next = stock.checked_add(delta).ok_or_else(|| {
                CatalogError::validation(Some(id), field, "stock level overflow")
            })?;
            if next < 0 {
                return Err(CatalogError::validation(
                    Some(id),
                    field,
                    format!("cannot issue {} from a stock of {}", -delta, stock),
                ));
            }
            *stock = next;
            if delta > 0 {
                if let Some(date) = received_on {
                    *last_received = Some(date);
                }
            }
            level = next;
            Ok(record)
        })?;
        Ok(level)
    }

    /// Shared update path: lock, re-read, change, validate, commit
    fn mutate(
        &self,
        op: &str,
        id: &EntityId,
        expected_version: Option<u64>,
        change: impl FnOnce(&Record) -> Result<Record, CatalogError>,
    ) -> Result<StoredRecord, CatalogError> {
        let target = LockKey::Entity(id.clone());
        let _target_guard = self.locks.acquire([target.clone()])?;

        let snapshot = self.snapshot();
        let current = snapshot
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        if let Some(expected) = expected_version {
            if current.version != expected {
                return Err(CatalogError::Busy {
                    id: Some(id.clone()),
                    reason: format!(
                        "{} is at version {}, not {}",
                        id, current.version, expected
                    ),
                });
            }
        }
        if !current.is_live() {
            return Err(CatalogError::validation(
                Some(id),
                "retired_at",
                "retired entities cannot be changed",
            ));
        }

        let updated = change(&current.record).inspect_err(|e| log_rejection(op, id, e))?;
        if updated == current.record {
            return Ok(current);
        }

        // References of both versions, plus sourcing pairs of cross-references
        // that link a contract whose term may change
        let mut keys = lock_keys(&current.record);
        keys.extend(lock_keys(&updated));
        if let Record::Contract(ref contract) = updated {
            let validator = Validator::new(&snapshot, self.clock.today());
            keys.extend(validator.linked_cross_references(&contract.id).map(|x| {
                LockKey::Sourcing {
                    part: x.part.clone(),
                    manufacturer: x.manufacturer.clone(),
                }
            }));
        }
        keys.retain(|k| *k != target);
        let _reference_guard = self.locks.acquire(keys)?;

        let snapshot = self.snapshot();
        Validator::new(&snapshot, self.clock.today())
            .check(&updated)
            .inspect_err(|e| log_rejection(op, id, e))?;

        let now = self.clock.now();
        let changes = audit::diff(&current.record, &updated, now)?;
        let mut stored = StoredRecord {
            record: updated,
            version: current.version,
            retired_at: None,
        };
        stored.version = self.commit(&stored, &changes)?;
        tracing::debug!(op, id = %id, version = stored.version, fields = changes.len(), "updated");

        let committed = stored.clone();
        self.publish(|s| s.upsert(stored));
        Ok(committed)
    }

    // =========================================================================
    // Retire / purge
    // =========================================================================

    /// Live entities that depend on `id`, directly or transitively
    pub fn find_dependents(&self, id: &EntityId) -> Result<Vec<EntityId>, CatalogError> {
        let snapshot = self.snapshot();
        if snapshot.get(id).is_none() {
            return Err(CatalogError::NotFound(id.clone()));
        }
        Ok(snapshot.dependents(id))
    }

    /// Retire an entity that nothing live depends on
    ///
    /// The entity stays stored (and visible to `get`) with a retirement
    /// timestamp; it can no longer be changed or referenced. Physical
    /// deletion is [`purge`](Self::purge).
    pub fn retire(&self, id: &EntityId) -> Result<RetireOutcome, CatalogError> {
        let _guard = self.locks.acquire([LockKey::Entity(id.clone())])?;
        let snapshot = self.snapshot();
        let current = snapshot
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        if !current.is_live() {
            return Ok(RetireOutcome::Unchanged);
        }

        let conflicts = snapshot.dependents(id);
        if !conflicts.is_empty() {
            let err = CatalogError::ReferentialConflict {
                id: id.clone(),
                conflicts,
            };
            log_rejection("retire", id, &err);
            return Err(err);
        }

        let now = self.clock.now();
        let mut stored = current;
        stored.retired_at = Some(now);
        stored.version = self.commit(&stored, &[audit::retired(id, now)])?;
        tracing::info!(id = %id, "retired");

        self.publish(|s| s.upsert(stored));
        Ok(RetireOutcome::Retired)
    }

    /// Physically delete an entity that nothing references, live or retired
    pub fn purge(&self, id: &EntityId) -> Result<(), CatalogError> {
        let _guard = self.locks.acquire([LockKey::Entity(id.clone())])?;
        let snapshot = self.snapshot();
        let current = snapshot
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        let mut conflicts: Vec<EntityId> =
            snapshot.referrers(id).map(|r| r.id().clone()).collect();
        if !conflicts.is_empty() {
            conflicts.sort();
            let err = CatalogError::ReferentialConflict {
                id: id.clone(),
                conflicts,
            };
            log_rejection("purge", id, &err);
            return Err(err);
        }

        let change = audit::removed(&current.record, self.clock.now())?;
        self.persistence
            .commit_removal(current.kind(), id, &[change])
            .map_err(|e| {
                tracing::error!(id = %id, error = %e, "purge failed");
                CatalogError::from(e)
            })?;
        tracing::info!(id = %id, "purged");

        self.publish(|s| {
            s.remove(id);
        });
        Ok(())
    }

    // =========================================================================
    // Persistence passthrough
    // =========================================================================

    /// Re-read one entity from persistence and republish it
    ///
    /// Returns the reloaded record, or None if the backend no longer has it.
    pub fn reload(&self, id: &EntityId) -> Result<Option<StoredRecord>, CatalogError> {
        let _guard = self.locks.acquire([LockKey::Entity(id.clone())])?;
        let loaded = self.persistence.load(id.kind(), id)?;
        match loaded.clone() {
            Some(stored) => self.publish(|s| s.upsert(stored)),
            None => self.publish(|s| {
                s.remove(id);
            }),
        }
        tracing::debug!(id = %id, present = loaded.is_some(), "reloaded");
        Ok(loaded)
    }

    /// The audit log in append order, optionally for one entity
    pub fn audit_trail(&self, entity: Option<&EntityId>) -> Result<Vec<AuditRecord>, CatalogError> {
        Ok(self.persistence.audit_trail(entity)?)
    }
}
