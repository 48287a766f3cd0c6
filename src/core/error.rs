//! Catalog error kinds
//!
//! Every constraint violation is reported to the caller, never repaired.
//! Only [`CatalogError::Busy`] is safe to retry automatically.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::identity::{EntityId, EntityKind};
use crate::core::persistence::PersistenceError;

/// Why a reference could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DanglingReason {
    /// No entity with that id exists
    Missing,
    /// The entity exists but has been retired
    Retired,
    /// The id names an entity of a different kind than the field expects
    WrongKind(EntityKind),
}

impl std::fmt::Display for DanglingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DanglingReason::Missing => write!(f, "missing"),
            DanglingReason::Retired => write!(f, "retired"),
            DanglingReason::WrongKind(expected) => write!(f, "not a {}", expected.label()),
        }
    }
}

/// Errors surfaced by the catalog store, validator and facade
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("invalid {field}: {message}")]
    #[diagnostic(code(vpm::validation), help("fix the input and resubmit"))]
    Validation {
        entity: Option<EntityId>,
        field: String,
        message: String,
    },

    #[error("entity not found: {0}")]
    #[diagnostic(code(vpm::not_found))]
    NotFound(EntityId),

    #[error("{field} references {target}, which is {reason}")]
    #[diagnostic(code(vpm::dangling_reference))]
    DanglingReference {
        entity: Option<EntityId>,
        field: String,
        target: EntityId,
        reason: DanglingReason,
    },

    #[error(
        "{part} is already sourced from {manufacturer} under active contract {existing}; \
         cannot also link {requested}"
    )]
    #[diagnostic(
        code(vpm::conflicting_contract),
        help("retire the existing cross-reference or let its contract lapse first")
    )]
    ConflictingContract {
        part: EntityId,
        manufacturer: EntityId,
        existing: EntityId,
        requested: EntityId,
    },

    #[error("{id} is still referenced by {}", join_ids(.conflicts))]
    #[diagnostic(
        code(vpm::referential_conflict),
        help("retire the listed dependents first")
    )]
    ReferentialConflict {
        id: EntityId,
        conflicts: Vec<EntityId>,
    },

    #[error("busy: {reason}")]
    #[diagnostic(code(vpm::busy), help("retry the operation with backoff"))]
    Busy {
        id: Option<EntityId>,
        reason: String,
    },

    #[error("storage failure: {0}")]
    #[diagnostic(code(vpm::storage))]
    Storage(PersistenceError),
}

fn join_ids(ids: &[EntityId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CatalogError {
    /// Shorthand for a validation failure
    pub fn validation(
        entity: Option<&EntityId>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CatalogError::Validation {
            entity: entity.cloned(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors a caller may retry unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Busy { .. })
    }
}

impl From<PersistenceError> for CatalogError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::VersionConflict {
                id,
                expected,
                found,
            } => CatalogError::Busy {
                reason: format!(
                    "{} changed concurrently (expected version {}, found {})",
                    id, expected, found
                ),
                id: Some(id),
            },
            other => CatalogError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_maps_to_busy() {
        let id = EntityId::new(EntityKind::Part);
        let err: CatalogError = PersistenceError::VersionConflict {
            id: id.clone(),
            expected: 1,
            found: 2,
        }
        .into();
        assert!(err.is_retryable());
        assert!(matches!(err, CatalogError::Busy { id: Some(ref busy), .. } if *busy == id));
    }

    #[test]
    fn test_referential_conflict_message_lists_ids() {
        let part = EntityId::new(EntityKind::Part);
        let err = CatalogError::ReferentialConflict {
            id: EntityId::new(EntityKind::Manufacturer),
            conflicts: vec![part.clone()],
        };
        assert!(err.to_string().ends_with(&part.to_string()));
        assert!(!err.is_retryable());
    }
}
