//! Per-key exclusive locks with a bounded wait

use std::collections::HashSet;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::core::error::CatalogError;
use crate::core::identity::EntityId;

/// Something a mutation needs exclusive access to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    /// One entity
    Entity(EntityId),
    /// All cross-references for one (part, manufacturer) pair
    Sourcing { part: EntityId, manufacturer: EntityId },
}

impl LockKey {
    fn entity(&self) -> &EntityId {
        match self {
            LockKey::Entity(id) => id,
            LockKey::Sourcing { part, .. } => part,
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Entity(id) => write!(f, "{}", id),
            LockKey::Sourcing { part, manufacturer } => {
                write!(f, "sourcing {} / {}", part, manufacturer)
            }
        }
    }
}

/// Table of currently held keys
#[derive(Debug)]
pub struct LockTable {
    held: Mutex<HashSet<LockKey>>,
    released: Condvar,
    timeout: Duration,
}

impl LockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn held(&self) -> MutexGuard<'_, HashSet<LockKey>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take every key at once, waiting at most the table's timeout
    ///
    /// Either all keys are acquired or none are.
    pub fn acquire(
        &self,
        keys: impl IntoIterator<Item = LockKey>,
    ) -> Result<LockGuard<'_>, CatalogError> {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let deadline = Instant::now() + self.timeout;
        let mut held = self.held();
        loop {
            let blocking = keys.iter().find(|k| held.contains(*k)).cloned();
            let Some(blocking) = blocking else {
                held.extend(keys.iter().cloned());
                return Ok(LockGuard { table: self, keys });
            };

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(key = %blocking, "lock wait timed out");
                return Err(CatalogError::Busy {
                    id: Some(blocking.entity().clone()),
                    reason: format!(
                        "{} is locked by another mutation (waited {} ms)",
                        blocking,
                        self.timeout.as_millis()
                    ),
                });
            }
            held = self
                .released
                .wait_timeout(held, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Releases its keys on drop
#[must_use]
#[derive(Debug)]
pub struct LockGuard<'a> {
    table: &'a LockTable,
    keys: Vec<LockKey>,
}

impl LockGuard<'_> {
    pub fn keys(&self) -> &[LockKey] {
        &self.keys
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.table.held();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.table.released.notify_all();
    }
}
