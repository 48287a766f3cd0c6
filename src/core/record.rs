//! Tagged records, stored envelopes and partial-update patches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::entity::{Entity, Reference};
use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::entities::{
    CrossReference, Manufacturer, Module, Part, ProcurementContract, QualityCertification,
};

/// Any catalog entity, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Manufacturer(Manufacturer),
    Module(Module),
    Part(Part),
    Certification(QualityCertification),
    Contract(ProcurementContract),
    CrossReference(CrossReference),
}

macro_rules! each_entity {
    ($record:expr, $inner:ident => $body:expr) => {
        match $record {
            Record::Manufacturer($inner) => $body,
            Record::Module($inner) => $body,
            Record::Part($inner) => $body,
            Record::Certification($inner) => $body,
            Record::Contract($inner) => $body,
            Record::CrossReference($inner) => $body,
        }
    };
}

impl Record {
    pub fn id(&self) -> &EntityId {
        each_entity!(self, e => e.id())
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Manufacturer(_) => EntityKind::Manufacturer,
            Record::Module(_) => EntityKind::Module,
            Record::Part(_) => EntityKind::Part,
            Record::Certification(_) => EntityKind::Certification,
            Record::Contract(_) => EntityKind::Contract,
            Record::CrossReference(_) => EntityKind::CrossReference,
        }
    }

    pub fn title(&self) -> &str {
        each_entity!(self, e => e.title())
    }

    pub fn references(&self) -> Vec<Reference> {
        each_entity!(self, e => e.references())
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        each_entity!(self, e => e.validate())
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        each_entity!(self, e => e.set_id(id))
    }

    /// Borrow the inner entity as a concrete type
    pub fn as_entity<E: Entity>(&self) -> Option<&E> {
        E::from_record(self)
    }

    /// The entity payload as a JSON object (without the kind tag)
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        each_entity!(self, e => serde_json::to_value(e))
    }

    /// Rebuild a record of the given kind from a JSON payload
    pub fn from_payload(kind: EntityKind, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EntityKind::Manufacturer => Record::Manufacturer(serde_json::from_value(payload)?),
            EntityKind::Module => Record::Module(serde_json::from_value(payload)?),
            EntityKind::Part => Record::Part(serde_json::from_value(payload)?),
            EntityKind::Certification => Record::Certification(serde_json::from_value(payload)?),
            EntityKind::Contract => Record::Contract(serde_json::from_value(payload)?),
            EntityKind::CrossReference => {
                Record::CrossReference(serde_json::from_value(payload)?)
            }
        })
    }
}

/// A record as held by the store: payload plus lifecycle metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record: Record,

    /// Commit version; 0 means never saved
    pub version: u64,

    /// Set when the entity has been soft-retired
    #[serde(default)]
    pub retired_at: Option<DateTime<Utc>>,
}

impl StoredRecord {
    /// Wrap a record that has not been saved yet
    pub fn new(record: Record) -> Self {
        Self {
            record,
            version: 0,
            retired_at: None,
        }
    }

    pub fn id(&self) -> &EntityId {
        self.record.id()
    }

    pub fn kind(&self) -> EntityKind {
        self.record.kind()
    }

    /// Not retired
    pub fn is_live(&self) -> bool {
        self.retired_at.is_none()
    }

    pub fn as_entity<E: Entity>(&self) -> Option<&E> {
        self.record.as_entity()
    }
}

/// A partial update: top-level field assignments applied to an entity
///
/// Entity payloads serialize every field (optional ones as `null`), so a
/// patch may only name fields that appear in the payload. The `id` field is
/// immutable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Map<String, Value>,
    rejected: Vec<(String, String)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a field from any serializable value
    pub fn set(mut self, field: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.fields.insert(field.to_string(), v);
            }
            Err(e) => self.rejected.push((field.to_string(), e.to_string())),
        }
        self
    }

    /// Assign a field from a raw JSON value
    pub fn set_value(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    /// Build a patch from a JSON object
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            rejected: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.rejected.is_empty()
    }

    /// Names of the fields this patch assigns
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Apply the patch to a record, producing the updated record
    ///
    /// Does not check entity invariants; callers validate the result.
    pub fn apply(&self, record: &Record) -> Result<Record, CatalogError> {
        let id = record.id();
        if let Some((field, message)) = self.rejected.first() {
            return Err(CatalogError::validation(Some(id), field, message));
        }

        let mut payload = record
            .payload()
            .map_err(|e| CatalogError::validation(Some(id), "record", e.to_string()))?;
        let object = payload.as_object_mut().ok_or_else(|| {
            CatalogError::validation(Some(id), "record", "payload is not an object")
        })?;

        for (field, value) in &self.fields {
            if field == "id" {
                return Err(CatalogError::validation(Some(id), "id", "identity is immutable"));
            }
            if !object.contains_key(field) {
                return Err(CatalogError::validation(
                    Some(id),
                    field,
                    format!("unknown field for {}", record.kind().label()),
                ));
            }
            object.insert(field.clone(), value.clone());
        }

        Record::from_payload(record.kind(), payload).map_err(|e| {
            let fields: Vec<&str> = self.field_names().collect();
            CatalogError::validation(Some(id), fields.join(", "), e.to_string())
        })
    }
}
