//! Module entity type - vehicle subsystems (ECM, APA, ...) stocked as units

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::entity::{
    require_amount, require_non_negative, require_text, Criticality, Entity, OperationalStatus,
    Reference,
};
use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;

/// A vehicle module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Unique identifier
    pub id: EntityId,

    /// Module type / category tag (e.g. "ECM", "APA")
    pub module_type: String,

    /// Model designation
    pub model: String,

    /// Owning manufacturer
    pub manufacturer: EntityId,

    #[serde(default)]
    pub description: Option<String>,

    /// Vehicle or platform the module is installed in (e.g. "M1126 ICV")
    #[serde(default)]
    pub installation_environment: Option<String>,

    #[serde(default)]
    pub status: OperationalStatus,

    #[serde(default)]
    pub criticality: Criticality,

    /// Units on hand
    #[serde(default)]
    pub stock_count: i64,

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
}

impl Entity for Module {
    const KIND: EntityKind = EntityKind::Module;

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
        vec![Reference::new(
            "manufacturer",
            &self.manufacturer,
            EntityKind::Manufacturer,
        )]
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require_text(&self.id, "model", &self.model)?;
        require_text(&self.id, "module_type", &self.module_type)?;
        require_non_negative(&self.id, "stock_count", self.stock_count)?;
        if let Some(threshold) = self.reorder_threshold {
            require_non_negative(&self.id, "reorder_threshold", threshold)?;
        }
        if let Some(cost) = self.unit_cost {
            require_amount(&self.id, "unit_cost", cost)?;
        }
        Ok(())
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Module(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Module> for Record {
    fn from(value: Module) -> Self {
        Record::Module(value)
    }
}

impl Module {
    /// Create a new active module
    pub fn new(
        module_type: impl Into<String>,
        model: impl Into<String>,
        manufacturer: EntityId,
    ) -> Self {
        Self {
            id: EntityId::new(EntityKind::Module),
            module_type: module_type.into(),
            model: model.into(),
            manufacturer,
            description: None,
            installation_environment: None,
            status: OperationalStatus::default(),
            criticality: Criticality::default(),
            stock_count: 0,
            reorder_threshold: None,
            unit_cost: None,
            lead_time_days: None,
            last_ordered: None,
            last_received: None,
        }
    }

    /// Set stock count and reorder threshold
    pub fn with_stock(mut self, stock_count: i64, reorder_threshold: i64) -> Self {
        self.stock_count = stock_count;
        self.reorder_threshold = Some(reorder_threshold);
        self
    }
}
