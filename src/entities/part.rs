//! Part entity type - individual parts, optionally owned by a module
//!
//! Module-specific part variants share one shape: a `module_type` tag plus a
//! free-form attribute bag for the variant's extra columns.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::entity::{
    require_amount, require_non_negative, require_text, Criticality, Entity, Reference,
};
use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;

/// A part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Unique identifier
    pub id: EntityId,

    /// Owning module (None for free-standing parts)
    #[serde(default)]
    pub module: Option<EntityId>,

    /// Module-type discriminant (e.g. "ECM"); must match the owning module's type
    #[serde(default)]
    pub module_type: Option<String>,

    /// Part type / category (e.g. "sensor", "harness")
    #[serde(default)]
    pub category: Option<String>,

    /// Model / part number
    pub model: String,

    /// Manufacturer of record
    pub manufacturer: EntityId,

    /// Specification text
    #[serde(default)]
    pub specification: Option<String>,

    #[serde(default)]
    pub criticality: Criticality,

    /// Units on hand
    #[serde(default)]
    pub stock_level: i64,

    /// Reorder when stock falls to this level
    #[serde(default)]
    pub reorder_threshold: Option<i64>,

    #[serde(default)]
    pub unit_cost: Option<f64>,

    #[serde(default)]
    pub lead_time_days: Option<u32>,

    #[serde(default)]
    pub last_ordered: Option<NaiveDate>,

    #[serde(default)]
    pub last_received: Option<NaiveDate>,

    /// Variant-specific attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Entity for Part {
    const KIND: EntityKind = EntityKind::Part;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> &str {
        &self.model
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new(
            "manufacturer",
            &self.manufacturer,
            EntityKind::Manufacturer,
        )];
        if let Some(ref module) = self.module {
            refs.push(Reference::new("module", module, EntityKind::Module));
        }
        refs
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require_text(&self.id, "model", &self.model)?;
        require_non_negative(&self.id, "stock_level", self.stock_level)?;
        if let Some(threshold) = self.reorder_threshold {
            require_non_negative(&self.id, "reorder_threshold", threshold)?;
        }
        if let Some(cost) = self.unit_cost {
            require_amount(&self.id, "unit_cost", cost)?;
        }
        if let Some(ref tag) = self.module_type {
            require_text(&self.id, "module_type", tag)?;
        }
        Ok(())
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Part(p) => Some(p),
            _ => None,
        }
    }
}

impl From<Part> for Record {
    fn from(value: Part) -> Self {
        Record::Part(value)
    }
}

impl Part {
    /// Create a new free-standing part
    pub fn new(model: impl Into<String>, manufacturer: EntityId) -> Self {
        Self {
            id: EntityId::new(EntityKind::Part),
            module: None,
            module_type: None,
            category: None,
            model: model.into(),
            manufacturer,
            specification: None,
            criticality: Criticality::default(),
            stock_level: 0,
            reorder_threshold: None,
            unit_cost: None,
            lead_time_days: None,
            last_ordered: None,
            last_received: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Attach the part to a module of the given type
    pub fn in_module(mut self, module: EntityId, module_type: impl Into<String>) -> Self {
        self.module = Some(module);
        self.module_type = Some(module_type.into());
        self
    }

    /// Set stock level and reorder threshold
    pub fn with_stock(mut self, stock_level: i64, reorder_threshold: i64) -> Self {
        self.stock_level = stock_level;
        self.reorder_threshold = Some(reorder_threshold);
        self
    }

    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }

    /// Set a variant-specific attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}
