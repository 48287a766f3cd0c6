//! Field-level audit records for every committed mutation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::CatalogError;
use crate::core::identity::EntityId;
use crate::core::record::Record;

/// Field name used when a whole record is removed
pub const REMOVED_FIELD: &str = "record";

/// Field name used when a record is soft-retired
pub const RETIRED_FIELD: &str = "retired_at";

/// One changed field of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub entity: EntityId,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        entity: &EntityId,
        field: impl Into<String>,
        old_value: Value,
        new_value: Value,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity: entity.clone(),
            field: field.into(),
            old_value,
            new_value,
            recorded_at,
        }
    }
}

fn payload_of(record: &Record) -> Result<serde_json::Map<String, Value>, CatalogError> {
    match record.payload() {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CatalogError::validation(
            Some(record.id()),
            "record",
            "payload is not an object",
        )),
        Err(e) => Err(CatalogError::validation(Some(record.id()), "record", e.to_string())),
    }
}

/// Audit records for a newly created entity: every non-null field, old = null
pub fn created(record: &Record, at: DateTime<Utc>) -> Result<Vec<AuditRecord>, CatalogError> {
    let id = record.id();
    Ok(payload_of(record)?
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(field, value)| AuditRecord::new(id, field, Value::Null, value, at))
        .collect())
}

/// Audit records for the fields that differ between two versions of an entity
pub fn diff(
    before: &Record,
    after: &Record,
    at: DateTime<Utc>,
) -> Result<Vec<AuditRecord>, CatalogError> {
    let id = after.id();
    let old = payload_of(before)?;
    let new = payload_of(after)?;

    let mut changes = Vec::new();
    for (field, new_value) in new {
        let old_value = old.get(&field).cloned().unwrap_or(Value::Null);
        if old_value != new_value {
            changes.push(AuditRecord::new(id, field, old_value, new_value, at));
        }
    }
    Ok(changes)
}

/// Audit record for a soft retirement
pub fn retired(id: &EntityId, at: DateTime<Utc>) -> AuditRecord {
    AuditRecord::new(
        id,
        RETIRED_FIELD,
        Value::Null,
        Value::String(at.to_rfc3339()),
        at,
    )
}

/// Audit record for a physical removal, keeping the removed payload
pub fn removed(record: &Record, at: DateTime<Utc>) -> Result<AuditRecord, CatalogError> {
    Ok(AuditRecord::new(
        record.id(),
        REMOVED_FIELD,
        Value::Object(payload_of(record)?),
        Value::Null,
        at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityKind;
    use crate::core::record::Patch;
    use crate::entities::Part;

    #[test]
    fn test_created_skips_null_fields() {
        let record: Record = Part::new("X-1", EntityId::new(EntityKind::Manufacturer)).into();
        let records = created(&record, Utc::now()).unwrap();
        assert!(records.iter().any(|r| r.field == "model"));
        assert!(!records.iter().any(|r| r.field == "specification"));
        assert!(records.iter().all(|r| r.old_value.is_null()));
    }

    #[test]
    fn test_diff_reports_only_changed_fields() {
        let before: Record = Part::new("X-1", EntityId::new(EntityKind::Manufacturer))
            .with_stock(5, 10)
            .into();
        let after = Patch::new()
            .set("stock_level", 3)
            .set("model", "X-1")
            .apply(&before)
            .unwrap();

        let changes = diff(&before, &after, Utc::now()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "stock_level");
        assert_eq!(changes[0].old_value, 5);
        assert_eq!(changes[0].new_value, 3);
    }
}
