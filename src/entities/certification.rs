//! Quality certification entity type

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::entity::{require_text, Entity, Reference};
use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;

/// A quality certification held by a part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCertification {
    /// Unique identifier
    pub id: EntityId,

    /// Certified part
    pub part: EntityId,

    /// Certification level (e.g. "AS9100D", "MIL-STD-810H")
    pub level: String,

    /// Last day the certification is valid
    pub valid_until: NaiveDate,

    /// Issuing authority
    pub issuing_authority: String,
}

impl Entity for QualityCertification {
    const KIND: EntityKind = EntityKind::Certification;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> &str {
        &self.level
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new("part", &self.part, EntityKind::Part)]
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require_text(&self.id, "level", &self.level)?;
        require_text(&self.id, "issuing_authority", &self.issuing_authority)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Certification(c) => Some(c),
            _ => None,
        }
    }
}

impl From<QualityCertification> for Record {
    fn from(value: QualityCertification) -> Self {
        Record::Certification(value)
    }
}

impl QualityCertification {
    pub fn new(
        part: EntityId,
        level: impl Into<String>,
        valid_until: NaiveDate,
        issuing_authority: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityKind::Certification),
            part,
            level: level.into(),
            valid_until,
            issuing_authority: issuing_authority.into(),
        }
    }

    /// Expired iff `today` is past the validity date
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.valid_until
    }
}
