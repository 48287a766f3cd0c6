//! Procurement contract entity type

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::entity::{require_amount, Entity, PriceRisk, Reference};
use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;

/// A procurement contract with a manufacturer, optionally for one module or part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcurementContract {
    /// Unique identifier
    pub id: EntityId,

    /// Contracted manufacturer
    pub manufacturer: EntityId,

    #[serde(default)]
    pub module: Option<EntityId>,

    #[serde(default)]
    pub part: Option<EntityId>,

    /// Contract start date
    pub contract_date: NaiveDate,

    /// Contracted quantity (> 0)
    pub quantity: i64,

    /// Unit price (>= 0)
    pub unit_price: f64,

    #[serde(default)]
    pub delivery_terms: Option<String>,

    /// Term length; None means open-ended
    #[serde(default)]
    pub duration_months: Option<u32>,

    #[serde(default)]
    pub price_volatility_risk: PriceRisk,

    /// Last delivery-performance review
    #[serde(default)]
    pub last_delivery_performance: Option<NaiveDate>,
}

impl Entity for ProcurementContract {
    const KIND: EntityKind = EntityKind::Contract;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> &str {
        self.delivery_terms.as_deref().unwrap_or("procurement contract")
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
        if let Some(ref part) = self.part {
            refs.push(Reference::new("part", part, EntityKind::Part));
        }
        refs
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.quantity <= 0 {
            return Err(CatalogError::validation(
                Some(&self.id),
                "quantity",
                format!("must be > 0 (got {})", self.quantity),
            ));
        }
        require_amount(&self.id, "unit_price", self.unit_price)?;
        if self.end_date().is_none() && self.duration_months.is_some() {
            return Err(CatalogError::validation(
                Some(&self.id),
                "duration_months",
                "contract end date is out of range",
            ));
        }
        Ok(())
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Contract(c) => Some(c),
            _ => None,
        }
    }
}

impl From<ProcurementContract> for Record {
    fn from(value: ProcurementContract) -> Self {
        Record::Contract(value)
    }
}

impl ProcurementContract {
    pub fn new(
        manufacturer: EntityId,
        contract_date: NaiveDate,
        quantity: i64,
        unit_price: f64,
    ) -> Self {
        Self {
            id: EntityId::new(EntityKind::Contract),
            manufacturer,
            module: None,
            part: None,
            contract_date,
            quantity,
            unit_price,
            delivery_terms: None,
            duration_months: None,
            price_volatility_risk: PriceRisk::default(),
            last_delivery_performance: None,
        }
    }

    pub fn for_part(mut self, part: EntityId) -> Self {
        self.part = Some(part);
        self
    }

    pub fn for_module(mut self, module: EntityId) -> Self {
        self.module = Some(module);
        self
    }

    pub fn with_duration(mut self, months: u32) -> Self {
        self.duration_months = Some(months);
        self
    }

    /// Contract date plus the term in calendar months; None if open-ended
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.duration_months
            .and_then(|m| self.contract_date.checked_add_months(Months::new(m)))
    }

    /// True while `today` falls inside the contract term
    pub fn in_term(&self, today: NaiveDate) -> bool {
        match self.duration_months {
            None => true,
            Some(_) => self.end_date().is_some_and(|end| end >= today),
        }
    }

    /// True once the term has ended
    pub fn has_ended(&self, today: NaiveDate) -> bool {
        self.end_date().is_some_and(|end| end < today)
    }
}
