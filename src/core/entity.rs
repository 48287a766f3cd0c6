//! Entity trait - common interface for all catalog entity types

use serde::{de::DeserializeOwned, Serialize};

use crate::core::error::CatalogError;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;

/// A foreign-key edge from an entity to one it depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Field on the referencing entity
    pub field: &'static str,
    /// Referenced entity
    pub target: EntityId,
    /// Kind the field is declared to point at
    pub expected: EntityKind,
}

impl Reference {
    pub fn new(field: &'static str, target: &EntityId, expected: EntityKind) -> Self {
        Self {
            field,
            target: target.clone(),
            expected,
        }
    }
}

/// Common trait for all catalog entities
pub trait Entity: Serialize + DeserializeOwned + Clone + Into<Record> {
    /// The entity kind (also the id prefix)
    const KIND: EntityKind;

    /// Get the entity's unique ID
    fn id(&self) -> &EntityId;

    /// Replace the entity's ID (the store assigns identities on create)
    fn set_id(&mut self, id: EntityId);

    /// Get the entity's display name
    fn title(&self) -> &str;

    /// Every reference this entity holds to another entity
    fn references(&self) -> Vec<Reference>;

    /// Check field-level invariants (required fields, value ranges)
    fn validate(&self) -> Result<(), CatalogError>;

    /// Borrow this entity type out of a record, if the kinds match
    fn from_record(record: &Record) -> Option<&Self>;
}

/// Require a non-blank string field
pub(crate) fn require_text(id: &EntityId, field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::validation(Some(id), field, "must not be empty"));
    }
    Ok(())
}

/// Require a non-negative count
pub(crate) fn require_non_negative(id: &EntityId, field: &str, value: i64) -> Result<(), CatalogError> {
    if value < 0 {
        return Err(CatalogError::validation(
            Some(id),
            field,
            format!("must be >= 0 (got {})", value),
        ));
    }
    Ok(())
}

/// Require a finite, non-negative amount (rejects NaN)
pub(crate) fn require_amount(id: &EntityId, field: &str, value: f64) -> Result<(), CatalogError> {
    if !(value >= 0.0) || !value.is_finite() {
        return Err(CatalogError::validation(
            Some(id),
            field,
            format!("must be a finite amount >= 0 (got {})", value),
        ));
    }
    Ok(())
}

/// Criticality of a part or module, ordered by severity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum Criticality {
    #[default]
    NonCritical,
    Critical,
    MissionCritical,
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criticality::NonCritical => write!(f, "non_critical"),
            Criticality::Critical => write!(f, "critical"),
            Criticality::MissionCritical => write!(f, "mission_critical"),
        }
    }
}

impl std::str::FromStr for Criticality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "non_critical" | "noncritical" => Ok(Criticality::NonCritical),
            "critical" => Ok(Criticality::Critical),
            "mission_critical" | "missioncritical" => Ok(Criticality::MissionCritical),
            _ => Err(format!(
                "Unknown criticality: {}. Use non_critical, critical, or mission_critical",
                s
            )),
        }
    }
}

/// Operational status of a module
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum OperationalStatus {
    #[default]
    Active,
    Inactive,
    UnderReview,
}

impl std::fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationalStatus::Active => write!(f, "active"),
            OperationalStatus::Inactive => write!(f, "inactive"),
            OperationalStatus::UnderReview => write!(f, "under_review"),
        }
    }
}

impl std::str::FromStr for OperationalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "active" => Ok(OperationalStatus::Active),
            "inactive" => Ok(OperationalStatus::Inactive),
            "under_review" | "underreview" => Ok(OperationalStatus::UnderReview),
            _ => Err(format!(
                "Unknown status: {}. Use active, inactive, or under_review",
                s
            )),
        }
    }
}

/// Financial-health rating of a manufacturer; `A` is best, `F` is worst
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum FinancialHealth {
    A,
    B,
    C,
    D,
    F,
}

impl FinancialHealth {
    /// Ratings that put mission-critical supply at risk
    pub fn is_distressed(&self) -> bool {
        matches!(self, FinancialHealth::D | FinancialHealth::F)
    }

    /// True if this rating is strictly worse than `other`
    pub fn is_below(&self, other: FinancialHealth) -> bool {
        *self > other
    }
}

impl std::fmt::Display for FinancialHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinancialHealth::A => write!(f, "A"),
            FinancialHealth::B => write!(f, "B"),
            FinancialHealth::C => write!(f, "C"),
            FinancialHealth::D => write!(f, "D"),
            FinancialHealth::F => write!(f, "F"),
        }
    }
}

impl std::str::FromStr for FinancialHealth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(FinancialHealth::A),
            "B" => Ok(FinancialHealth::B),
            "C" => Ok(FinancialHealth::C),
            "D" => Ok(FinancialHealth::D),
            "F" => Ok(FinancialHealth::F),
            _ => Err(format!("Unknown rating: {}. Use A, B, C, D, or F", s)),
        }
    }
}

/// Price-volatility risk of a procurement contract
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum PriceRisk {
    #[default]
    Low,
    Moderate,
    High,
    Severe,
}

impl std::fmt::Display for PriceRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceRisk::Low => write!(f, "low"),
            PriceRisk::Moderate => write!(f, "moderate"),
            PriceRisk::High => write!(f, "high"),
            PriceRisk::Severe => write!(f, "severe"),
        }
    }
}

impl std::str::FromStr for PriceRisk {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(PriceRisk::Low),
            "moderate" => Ok(PriceRisk::Moderate),
            "high" => Ok(PriceRisk::High),
            "severe" => Ok(PriceRisk::Severe),
            _ => Err(format!(
                "Unknown price risk: {}. Use low, moderate, high, or severe",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criticality_ordering() {
        assert!(Criticality::NonCritical < Criticality::Critical);
        assert!(Criticality::Critical < Criticality::MissionCritical);
    }

    #[test]
    fn test_rating_below() {
        assert!(FinancialHealth::C.is_below(FinancialHealth::B));
        assert!(!FinancialHealth::B.is_below(FinancialHealth::B));
        assert!(!FinancialHealth::A.is_below(FinancialHealth::B));
        assert!(FinancialHealth::F.is_distressed());
        assert!(!FinancialHealth::C.is_distressed());
    }

    #[test]
    fn test_rating_rejects_e() {
        assert!("E".parse::<FinancialHealth>().is_err());
        assert_eq!("d".parse::<FinancialHealth>().unwrap(), FinancialHealth::D);
    }

    #[test]
    fn test_status_parse_variants() {
        assert_eq!(
            "under-review".parse::<OperationalStatus>().unwrap(),
            OperationalStatus::UnderReview
        );
        assert_eq!(
            "mission_critical".parse::<Criticality>().unwrap(),
            Criticality::MissionCritical
        );
    }

    #[test]
    fn test_serialization_names() {
        assert_eq!(
            serde_json::to_string(&Criticality::MissionCritical).unwrap(),
            "\"mission_critical\""
        );
        assert_eq!(serde_json::to_string(&FinancialHealth::D).unwrap(), "\"D\"");
        assert_eq!(serde_json::to_string(&PriceRisk::Severe).unwrap(), "\"severe\"");
    }
}
