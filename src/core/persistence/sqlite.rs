//! SQLite persistence backend
//!
//! Each record is stored as a JSON body alongside its kind, version and
//! retirement timestamp. The audit log is a separate append-only table.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use super::{check_kind, Persistence, PersistenceError};
use crate::core::audit::AuditRecord;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::{Record, StoredRecord};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Catalog storage in a SQLite database file
pub struct SqlitePersistence {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqlitePersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePersistence").finish_non_exhaustive()
    }
}

impl SqlitePersistence {
    /// Open or create a catalog database at the given path
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        // WAL lets readers proceed alongside the single writer
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    /// A throwaway database, used by tests
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::Poisoned)
    }
}

fn init_schema(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- One row per entity; body is the tagged JSON record
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            version INTEGER NOT NULL,
            retired_at TEXT,
            body TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_records_kind ON records(kind);

        -- Field-level change history
        CREATE TABLE IF NOT EXISTS audit_log (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id TEXT NOT NULL,
            field TEXT NOT NULL,
            old_value TEXT NOT NULL,
            new_value TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_id);
        "#,
    )?;

    let current: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();

    match current {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }
        Some(v) if v == SCHEMA_VERSION => {}
        Some(v) => {
            return Err(PersistenceError::Corrupt(format!(
                "catalog schema version {} is not supported (expected {})",
                v, SCHEMA_VERSION
            )));
        }
    }
    Ok(())
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Corrupt(format!("bad timestamp '{}': {}", text, e)))
}

/// Raw columns of a `records` row
struct RecordRow {
    body: String,
    version: i64,
    retired_at: Option<String>,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            body: row.get(0)?,
            version: row.get(1)?,
            retired_at: row.get(2)?,
        })
    }

    fn decode(self) -> Result<StoredRecord, PersistenceError> {
        let record: Record = serde_json::from_str(&self.body)?;
        let retired_at = self.retired_at.as_deref().map(parse_timestamp).transpose()?;
        Ok(StoredRecord {
            record,
            version: u64::try_from(self.version)
                .map_err(|_| PersistenceError::Corrupt(format!("negative version {}", self.version)))?,
            retired_at,
        })
    }
}

/// Version-checked upsert; the caller owns the transaction
fn save_row(
    conn: &Connection,
    kind: EntityKind,
    record: &StoredRecord,
) -> Result<u64, PersistenceError> {
    check_kind(kind, record)?;
    let body = serde_json::to_string(&record.record)?;
    let id = record.id().to_string();

    let found: u64 = conn
        .query_row(
            "SELECT version FROM records WHERE id = ?1",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map_or(0, |v| v.max(0) as u64);

    if found != record.version {
        return Err(PersistenceError::VersionConflict {
            id: record.id().clone(),
            expected: record.version,
            found,
        });
    }

    let next = found + 1;
    conn.execute(
        "INSERT OR REPLACE INTO records (id, kind, version, retired_at, body)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            kind.prefix(),
            next as i64,
            record.retired_at.map(|t| t.to_rfc3339()),
            body
        ],
    )?;
    Ok(next)
}

fn remove_row(conn: &Connection, kind: EntityKind, id: &EntityId) -> Result<bool, PersistenceError> {
    let deleted = conn.execute(
        "DELETE FROM records WHERE id = ?1 AND kind = ?2",
        params![id.to_string(), kind.prefix()],
    )?;
    Ok(deleted > 0)
}

fn append_row(conn: &Connection, audit: &AuditRecord) -> Result<(), PersistenceError> {
    conn.execute(
        "INSERT INTO audit_log (entity_id, field, old_value, new_value, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            audit.entity.to_string(),
            audit.field,
            serde_json::to_string(&audit.old_value)?,
            serde_json::to_string(&audit.new_value)?,
            audit.recorded_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Persistence for SqlitePersistence {
    fn load(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Option<StoredRecord>, PersistenceError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT body, version, retired_at FROM records WHERE id = ?1 AND kind = ?2",
                params![id.to_string(), kind.prefix()],
                RecordRow::from_row,
            )
            .optional()?;
        row.map(RecordRow::decode).transpose()
    }

    fn save(&self, kind: EntityKind, record: &StoredRecord) -> Result<u64, PersistenceError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let version = save_row(&tx, kind, record)?;
        tx.commit()?;
        Ok(version)
    }

    fn remove(&self, kind: EntityKind, id: &EntityId) -> Result<bool, PersistenceError> {
        let conn = self.conn()?;
        remove_row(&conn, kind, id)
    }

    fn scan(
        &self,
        kind: EntityKind,
        predicate: &dyn Fn(&StoredRecord) -> bool,
    ) -> Result<Vec<StoredRecord>, PersistenceError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT body, version, retired_at FROM records WHERE kind = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![kind.prefix()], RecordRow::from_row)?;

        let mut out = Vec::new();
        for row in rows {
            let stored = row?.decode()?;
            if predicate(&stored) {
                out.push(stored);
            }
        }
        Ok(out)
    }

    fn append(&self, audit: &AuditRecord) -> Result<(), PersistenceError> {
        let conn = self.conn()?;
        append_row(&conn, audit)
    }

    fn commit(
        &self,
        kind: EntityKind,
        record: &StoredRecord,
        audit: &[AuditRecord],
    ) -> Result<u64, PersistenceError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let version = save_row(&tx, kind, record)?;
        for change in audit {
            append_row(&tx, change)?;
        }
        tx.commit()?;
        Ok(version)
    }

    fn commit_removal(
        &self,
        kind: EntityKind,
        id: &EntityId,
        audit: &[AuditRecord],
    ) -> Result<bool, PersistenceError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let existed = remove_row(&tx, kind, id)?;
        for change in audit {
            append_row(&tx, change)?;
        }
        tx.commit()?;
        Ok(existed)
    }

    fn audit_trail(&self, entity: Option<&EntityId>) -> Result<Vec<AuditRecord>, PersistenceError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT entity_id, field, old_value, new_value, recorded_at FROM audit_log
             WHERE ?1 IS NULL OR entity_id = ?1
             ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![entity.map(|id| id.to_string())], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (entity_id, field, old_value, new_value, recorded_at) = row?;
            let entity = EntityId::parse(&entity_id)
                .map_err(|e| PersistenceError::Corrupt(format!("audit entity '{}': {}", entity_id, e)))?;
            out.push(AuditRecord {
                entity,
                field,
                old_value: serde_json::from_str::<Value>(&old_value)?,
                new_value: serde_json::from_str::<Value>(&new_value)?,
                recorded_at: parse_timestamp(&recorded_at)?,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::FinancialHealth;
    use crate::entities::Manufacturer;
    use tempfile::tempdir;

    #[test]
    fn test_sqlite_backend_contract() {
        super::super::contract_tests::run_all(|| {
            Box::new(SqlitePersistence::open_in_memory().unwrap())
        });
    }

    #[test]
    fn test_records_survive_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(".vpm").join("catalog.db");

        let mut stored = StoredRecord::new(Manufacturer::new("Allison", FinancialHealth::B).into());
        stored.retired_at = Some(Utc::now());
        {
            let db = SqlitePersistence::open(&path).unwrap();
            db.save(EntityKind::Manufacturer, &stored).unwrap();
        }

        let db = SqlitePersistence::open(&path).unwrap();
        let loaded = db
            .load(EntityKind::Manufacturer, stored.id())
            .unwrap()
            .unwrap();
        assert_eq!(loaded.version, 1);
        assert!(!loaded.is_live());
        assert_eq!(loaded.record, stored.record);
    }

    #[test]
    fn test_failed_audit_insert_rolls_back_record() {
        let db = SqlitePersistence::open_in_memory().unwrap();
        db.conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_audit BEFORE INSERT ON audit_log
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let stored = StoredRecord::new(Manufacturer::new("Textron", FinancialHealth::B).into());
        let change = AuditRecord::new(
            stored.id(),
            "name",
            Value::Null,
            Value::from("Textron"),
            Utc::now(),
        );
        let err = db
            .commit(EntityKind::Manufacturer, &stored, &[change.clone()])
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Database(_)));
        assert!(db.load(EntityKind::Manufacturer, stored.id()).unwrap().is_none());

        db.save(EntityKind::Manufacturer, &stored).unwrap();
        let err = db
            .commit_removal(EntityKind::Manufacturer, stored.id(), &[change])
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Database(_)));
        assert!(db.load(EntityKind::Manufacturer, stored.id()).unwrap().is_some());
    }

    #[test]
    fn test_rejects_unknown_schema_version() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("catalog.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
                 INSERT INTO schema_version (version) VALUES (99);",
            )
            .unwrap();
        }
        let err = SqlitePersistence::open(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt(_)));
    }
}
