//! Manufacturer entity type - suppliers of record with financial health data

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::entity::{require_text, Entity, FinancialHealth, Reference};
use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;

/// A manufacturer supplying modules and parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manufacturer {
    /// Unique identifier
    pub id: EntityId,

    /// Legal or trading name
    pub name: String,

    /// Headquarters / plant location
    #[serde(default)]
    pub location: Option<String>,

    /// Contact person, email or phone
    #[serde(default)]
    pub contact: Option<String>,

    /// Publicly traded company
    #[serde(default)]
    pub public: bool,

    /// Financial-health rating
    pub financial_health: FinancialHealth,

    /// Annual revenue (latest fiscal year)
    #[serde(default)]
    pub annual_revenue: Option<f64>,

    /// Year-over-year revenue growth, percent
    #[serde(default)]
    pub revenue_growth_rate: Option<f64>,

    #[serde(default)]
    pub ebitda: Option<f64>,

    #[serde(default)]
    pub net_income: Option<f64>,

    /// Leverage: total debt / equity
    #[serde(default)]
    pub debt_to_equity: Option<f64>,

    /// Leverage: EBIT / interest expense
    #[serde(default)]
    pub interest_coverage: Option<f64>,

    #[serde(default)]
    pub cash_reserves: Option<f64>,

    /// External credit rating (e.g. "BBB+")
    #[serde(default)]
    pub credit_rating: Option<String>,

    /// Date of the last financial review
    #[serde(default)]
    pub last_financial_review: Option<NaiveDate>,
}

impl Entity for Manufacturer {
    const KIND: EntityKind = EntityKind::Manufacturer;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require_text(&self.id, "name", &self.name)
    }

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Manufacturer(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Manufacturer> for Record {
    fn from(value: Manufacturer) -> Self {
        Record::Manufacturer(value)
    }
}

impl Manufacturer {
    /// Create a new manufacturer with the given name and rating
    pub fn new(name: impl Into<String>, financial_health: FinancialHealth) -> Self {
        Self {
            id: EntityId::new(EntityKind::Manufacturer),
            name: name.into(),
            location: None,
            contact: None,
            public: false,
            financial_health,
            annual_revenue: None,
            revenue_growth_rate: None,
            ebitda: None,
            net_income: None,
            debt_to_equity: None,
            interest_coverage: None,
            cash_reserves: None,
            credit_rating: None,
            last_financial_review: None,
        }
    }

    /// Set the last financial review date
    pub fn reviewed_on(mut self, date: NaiveDate) -> Self {
        self.last_financial_review = Some(date);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manufacturer_creation() {
        let mfr = Manufacturer::new("General Dynamics Land Systems", FinancialHealth::A);
        assert!(mfr.id.to_string().starts_with("MFR-"));
        assert_eq!(mfr.title(), "General Dynamics Land Systems");
        assert!(mfr.references().is_empty());
        assert!(mfr.validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mfr = Manufacturer::new("  ", FinancialHealth::B);
        let err = mfr.validate().unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_optional_fields_serialize_as_null() {
        let mfr = Manufacturer::new("Allison", FinancialHealth::C);
        let value = serde_json::to_value(&mfr).unwrap();
        assert!(value.get("credit_rating").unwrap().is_null());
        assert_eq!(value["financial_health"], "C");
    }
}
