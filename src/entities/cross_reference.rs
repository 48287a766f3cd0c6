//! Parts/manufacturers cross-reference entity type
//!
//! Captures manufacturer-specific sourcing terms for a part. The `primary`
//! flag marks the row used for sourcing decisions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::entity::{require_amount, require_non_negative, Entity, Reference};
use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;

/// Sourcing terms for one part at one manufacturer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    /// Unique identifier
    pub id: EntityId,

    pub part: EntityId,

    pub manufacturer: EntityId,

    /// Quantity on hand at the manufacturer
    #[serde(default)]
    pub on_hand: i64,

    #[serde(default)]
    pub next_production_date: Option<NaiveDate>,

    #[serde(default)]
    pub next_production_quantity: Option<i64>,

    #[serde(default)]
    pub base_price: Option<f64>,

    #[serde(default)]
    pub expedited_price: Option<f64>,

    #[serde(default)]
    pub lead_time_days: Option<u32>,

    #[serde(default)]
    pub expedited_lead_time_days: Option<u32>,

    /// Contract these terms are negotiated under
    #[serde(default)]
    pub contract: Option<EntityId>,

    /// Primary sourcing row for this (part, manufacturer) pair
    #[serde(default)]
    pub primary: bool,
}

impl Entity for CrossReference {
    const KIND: EntityKind = EntityKind::CrossReference;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> &str {
        "cross-reference"
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![
            Reference::new("part", &self.part, EntityKind::Part),
            Reference::new("manufacturer", &self.manufacturer, EntityKind::Manufacturer),
        ];
        if let Some(ref contract) = self.contract {
            refs.push(Reference::new("contract", contract, EntityKind::Contract));
        }
        refs
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require_non_negative(&self.id, "on_hand", self.on_hand)?;
        if let Some(qty) = self.next_production_quantity {
            require_non_negative(&self.id, "next_production_quantity", qty)?;
        }
        if let Some(price) = self.base_price {
            require_amount(&self.id, "base_price", price)?;
        }
        if let Some(price) = self.expedited_price {
            require_amount(&self.id, "expedited_price", price)?;
        }
        Ok(())
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::CrossReference(x) => Some(x),
            _ => None,
        }
    }
}

impl From<CrossReference> for Record {
    fn from(value: CrossReference) -> Self {
        Record::CrossReference(value)
    }
}

impl CrossReference {
    pub fn new(part: EntityId, manufacturer: EntityId) -> Self {
        Self {
            id: EntityId::new(EntityKind::CrossReference),
            part,
            manufacturer,
            on_hand: 0,
            next_production_date: None,
            next_production_quantity: None,
            base_price: None,
            expedited_price: None,
            lead_time_days: None,
            expedited_lead_time_days: None,
            contract: None,
            primary: false,
        }
    }

    pub fn under_contract(mut self, contract: EntityId) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn as_primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// The (part, manufacturer) pair this row sources
    pub fn sourcing_pair(&self) -> (&EntityId, &EntityId) {
        (&self.part, &self.manufacturer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_is_optional_reference() {
        let part = EntityId::new(EntityKind::Part);
        let mfr = EntityId::new(EntityKind::Manufacturer);
        let xref = CrossReference::new(part.clone(), mfr.clone());
        assert_eq!(xref.references().len(), 2);
        assert_eq!(xref.sourcing_pair(), (&part, &mfr));

        let contract = EntityId::new(EntityKind::Contract);
        let xref = xref.under_contract(contract.clone()).as_primary();
        assert_eq!(xref.references().len(), 3);
        assert!(xref.primary);
    }

    #[test]
    fn test_negative_on_hand_rejected() {
        let mut xref = CrossReference::new(
            EntityId::new(EntityKind::Part),
            EntityId::new(EntityKind::Manufacturer),
        );
        xref.on_hand = -1;
        assert!(xref.validate().is_err());
    }
}
