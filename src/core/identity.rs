//! Entity identity system using kind-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Entity kinds tracked by the catalog. The kind doubles as the id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Manufacturer / supplier of record
    Manufacturer,
    /// Vehicle module (ECM, APA, ...)
    Module,
    /// Individual part
    Part,
    /// Quality certification held by a part
    Certification,
    /// Procurement contract
    Contract,
    /// Parts/manufacturers sourcing cross-reference
    CrossReference,
}

impl EntityKind {
    /// Get the id prefix for this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Manufacturer => "MFR",
            EntityKind::Module => "MOD",
            EntityKind::Part => "PART",
            EntityKind::Certification => "CERT",
            EntityKind::Contract => "CTR",
            EntityKind::CrossReference => "XREF",
        }
    }

    /// Human-readable name used in messages and audit output
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Manufacturer => "manufacturer",
            EntityKind::Module => "module",
            EntityKind::Part => "part",
            EntityKind::Certification => "certification",
            EntityKind::Contract => "contract",
            EntityKind::CrossReference => "cross-reference",
        }
    }

    /// Get all kinds, in dependency order (parents before children)
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Manufacturer,
            EntityKind::Module,
            EntityKind::Part,
            EntityKind::Certification,
            EntityKind::Contract,
            EntityKind::CrossReference,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

impl FromStr for EntityKind {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MFR" | "MANUFACTURER" => Ok(EntityKind::Manufacturer),
            "MOD" | "MODULE" => Ok(EntityKind::Module),
            "PART" => Ok(EntityKind::Part),
            "CERT" | "CERTIFICATION" => Ok(EntityKind::Certification),
            "CTR" | "CONTRACT" => Ok(EntityKind::Contract),
            "XREF" | "CROSS_REFERENCE" => Ok(EntityKind::CrossReference),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique entity identifier combining a kind prefix and ULID
///
/// Ordering is by kind, then ULID. Ids handed out by the catalog store come
/// from a monotonic generator, so within a kind the order is creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    kind: EntityKind,
    ulid: Ulid,
}

impl EntityId {
    /// Create a new EntityId of the given kind
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            ulid: Ulid::new(),
        }
    }

    /// Create an EntityId from a kind and existing ULID
    pub fn from_parts(kind: EntityKind, ulid: Ulid) -> Self {
        Self { kind, ulid }
    }

    /// Smallest possible id of a kind, used as a range start
    pub fn lower_bound(kind: EntityKind) -> Self {
        Self {
            kind,
            ulid: Ulid::nil(),
        }
    }

    /// Get the entity kind
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Get the ULID component
    pub fn ulid(&self) -> Ulid {
        self.ulid
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let kind = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { kind, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing entity IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid entity prefix: '{0}' (valid: MFR, MOD, PART, CERT, CTR, XREF)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in entity ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id = EntityId::new(EntityKind::Part);
        assert!(id.to_string().starts_with("PART-"));
        assert_eq!(id.to_string().len(), 31); // PART- (5) + ULID (26)
    }

    #[test]
    fn test_entity_id_parsing() {
        let original = EntityId::new(EntityKind::Manufacturer);
        let parsed = EntityId::parse(&original.to_string()).unwrap();
        assert_eq!(parsed.kind(), EntityKind::Manufacturer);
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_entity_id_invalid_prefix() {
        let err = EntityId::parse("REQ-01HQ3K4N5M6P7R8S9T0UVWXYZ").unwrap_err();
        assert!(matches!(err, IdParseError::InvalidPrefix(_)));
    }

    #[test]
    fn test_entity_id_missing_delimiter() {
        let err = EntityId::parse("PART01HQ3K4N5M6P7R8S9T0UVWXYZ").unwrap_err();
        assert!(matches!(err, IdParseError::MissingDelimiter(_)));
    }

    #[test]
    fn test_entity_id_invalid_ulid() {
        let err = EntityId::parse("CERT-notaulid").unwrap_err();
        assert!(matches!(err, IdParseError::InvalidUlid(_, _)));
    }

    #[test]
    fn test_all_kinds_parse() {
        for kind in EntityKind::all() {
            let id = EntityId::new(*kind);
            let parsed = EntityId::parse(&id.to_string()).unwrap();
            assert_eq!(parsed.kind(), *kind);
        }
    }

    #[test]
    fn test_lower_bound_sorts_first_within_kind() {
        let id = EntityId::new(EntityKind::Module);
        assert!(EntityId::lower_bound(EntityKind::Module) < id);
        assert!(id < EntityId::lower_bound(EntityKind::Part));
    }

    #[test]
    fn test_serde_as_string() {
        let id = EntityId::new(EntityKind::Contract);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
