//! Referential-integrity checks run before every mutation commits
//!
//! The validator is a pure function of a snapshot and today's date. The
//! store holds the locks that keep the snapshot's relevant parts stable
//! while a check runs.

use chrono::NaiveDate;

use crate::core::entity::Entity;
use crate::core::error::{CatalogError, DanglingReason};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;
use crate::core::snapshot::CatalogSnapshot;
use crate::entities::{CrossReference, Module, Part, ProcurementContract};

/// Checks a candidate record against a catalog snapshot
pub struct Validator<'a> {
    snapshot: &'a CatalogSnapshot,
    today: NaiveDate,
}

impl<'a> Validator<'a> {
    pub fn new(snapshot: &'a CatalogSnapshot, today: NaiveDate) -> Self {
        Self { snapshot, today }
    }

    /// Field invariants, references and cross-entity consistency
    pub fn check(&self, record: &Record) -> Result<(), CatalogError> {
        record.validate()?;
        self.check_references(record)?;
        match record {
            Record::Part(part) => self.check_part(part),
            Record::Module(module) => self.check_module(module),
            Record::Contract(contract) => self.check_contract(contract),
            Record::CrossReference(xref) => self.check_cross_reference(xref),
            Record::Manufacturer(_) | Record::Certification(_) => Ok(()),
        }
    }

    /// Every referenced id must exist, be live and be of the declared kind
    pub fn check_references(&self, record: &Record) -> Result<(), CatalogError> {
        for reference in record.references() {
            let reason = if reference.target.kind() != reference.expected {
                Some(DanglingReason::WrongKind(reference.expected))
            } else {
                match self.snapshot.get(&reference.target) {
                    None => Some(DanglingReason::Missing),
                    Some(target) if !target.is_live() => Some(DanglingReason::Retired),
                    Some(_) => None,
                }
            };

            if let Some(reason) = reason {
                return Err(CatalogError::DanglingReference {
                    entity: Some(record.id().clone()),
                    field: reference.field.to_string(),
                    target: reference.target,
                    reason,
                });
            }
        }
        Ok(())
    }

    /// A contract counts as active while live and within its term
    pub fn is_active_contract(&self, id: &EntityId) -> bool {
        self.snapshot
            .live_entity::<ProcurementContract>(id)
            .is_some_and(|c| c.in_term(self.today))
    }

    fn check_part(&self, part: &Part) -> Result<(), CatalogError> {
        let (Some(module_id), Some(tag)) = (&part.module, &part.module_type) else {
            return Ok(());
        };
        if let Some(module) = self.snapshot.entity::<Module>(module_id) {
            if !module.module_type.eq_ignore_ascii_case(tag) {
                return Err(CatalogError::validation(
                    Some(&part.id),
                    "module_type",
                    format!(
                        "'{}' does not match module {} of type '{}'",
                        tag, module.id, module.module_type
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Live parts already in the module must keep matching its type
    fn check_module(&self, module: &Module) -> Result<(), CatalogError> {
        let mismatch = self
            .snapshot
            .referrers(&module.id)
            .filter(|r| r.is_live())
            .filter_map(|r| r.as_entity::<Part>())
            .find(|p| {
                p.module.as_ref() == Some(&module.id)
                    && p.module_type
                        .as_deref()
                        .is_some_and(|t| !t.eq_ignore_ascii_case(&module.module_type))
            });

        match mismatch {
            Some(part) => Err(CatalogError::validation(
                Some(&module.id),
                "module_type",
                format!(
                    "part {} in this module is tagged '{}'",
                    part.id,
                    part.module_type.as_deref().unwrap_or_default()
                ),
            )),
            None => Ok(()),
        }
    }

    /// Cross-references that link a contract must stay with its
    /// manufacturer, and bringing the contract into term must not create a
    /// dual-sourcing conflict for any of them
    fn check_contract(&self, contract: &ProcurementContract) -> Result<(), CatalogError> {
        if let Some(xref) = self
            .linked_cross_references(&contract.id)
            .find(|x| x.manufacturer != contract.manufacturer)
        {
            return Err(CatalogError::validation(
                Some(&contract.id),
                "manufacturer",
                format!(
                    "cross-reference {} links this contract for {}",
                    xref.id, xref.manufacturer
                ),
            ));
        }

        if !contract.in_term(self.today) {
            return Ok(());
        }
        for xref in self.linked_cross_references(&contract.id) {
            if let Some(existing) = self
                .pair_rows(xref)
                .filter_map(|other| other.contract.as_ref())
                .find(|c| **c != contract.id && self.is_active_contract(c))
            {
                return Err(CatalogError::ConflictingContract {
                    part: xref.part.clone(),
                    manufacturer: xref.manufacturer.clone(),
                    existing: existing.clone(),
                    requested: contract.id.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_cross_reference(&self, xref: &CrossReference) -> Result<(), CatalogError> {
        if let Some(ref contract_id) = xref.contract {
            if let Some(contract) = self.snapshot.entity::<ProcurementContract>(contract_id) {
                if contract.manufacturer != xref.manufacturer {
                    return Err(CatalogError::validation(
                        Some(&xref.id),
                        "contract",
                        format!(
                            "contract {} is with {}, not {}",
                            contract.id, contract.manufacturer, xref.manufacturer
                        ),
                    ));
                }
            }
        }

        for other in self.pair_rows(xref) {
            if xref.primary && other.primary {
                return Err(CatalogError::validation(
                    Some(&xref.id),
                    "primary",
                    format!(
                        "{} is already the primary source for this part and manufacturer",
                        other.id
                    ),
                ));
            }

            if let (Some(mine), Some(theirs)) = (&xref.contract, &other.contract) {
                if mine != theirs && self.is_active_contract(mine) && self.is_active_contract(theirs)
                {
                    return Err(CatalogError::ConflictingContract {
                        part: xref.part.clone(),
                        manufacturer: xref.manufacturer.clone(),
                        existing: theirs.clone(),
                        requested: mine.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Other live cross-references for the same (part, manufacturer) pair
    fn pair_rows<'x>(
        &'x self,
        xref: &'x CrossReference,
    ) -> impl Iterator<Item = &'a CrossReference> + 'x {
        self.snapshot
            .referrers(&xref.part)
            .filter(|r| r.is_live() && r.kind() == EntityKind::CrossReference)
            .filter_map(|r| r.as_entity::<CrossReference>())
            .filter(move |other| {
                other.id != xref.id && other.sourcing_pair() == xref.sourcing_pair()
            })
    }

    /// Live cross-references that link a contract
    pub fn linked_cross_references<'x>(
        &'x self,
        contract: &'x EntityId,
    ) -> impl Iterator<Item = &'a CrossReference> + 'x {
        self.snapshot
            .referrers(contract)
            .filter(|r| r.is_live())
            .filter_map(|r| r.as_entity::<CrossReference>())
            .filter(move |x| x.contract.as_ref() == Some(contract))
    }
}

/// Entity kind check for typed lookups
pub(crate) fn expect_kind<E: Entity>(id: &EntityId) -> Result<(), CatalogError> {
    if id.kind() != E::KIND {
        return Err(CatalogError::validation(
            Some(id),
            "id",
            format!("expected a {} id", E::KIND.label()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::FinancialHealth;
    use crate::core::record::StoredRecord;
    use crate::entities::Manufacturer;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn live(record: impl Into<Record>) -> StoredRecord {
        let mut s = StoredRecord::new(record.into());
        s.version = 1;
        s
    }

    struct Fixture {
        snapshot: CatalogSnapshot,
        mfr: Manufacturer,
        part: Part,
    }

    fn fixture() -> Fixture {
        let mfr = Manufacturer::new("Oshkosh Defense", FinancialHealth::B);
        let part = Part::new("ECM-CTRL", mfr.id.clone());
        let snapshot = CatalogSnapshot::from_records([live(mfr.clone()), live(part.clone())]);
        Fixture {
            snapshot,
            mfr,
            part,
        }
    }

    #[test]
    fn test_missing_reference_is_dangling() {
        let f = fixture();
        let orphan = Part::new("X", EntityId::new(EntityKind::Manufacturer));
        let err = Validator::new(&f.snapshot, date(2026, 1, 1))
            .check(&orphan.into())
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DanglingReference { reason: DanglingReason::Missing, ref field, .. }
                if field == "manufacturer"
        ));
    }

    #[test]
    fn test_wrong_kind_reference_is_dangling() {
        let f = fixture();
        let bad = Part::new("X", f.part.id.clone());
        let err = Validator::new(&f.snapshot, date(2026, 1, 1))
            .check(&bad.into())
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DanglingReference {
                reason: DanglingReason::WrongKind(EntityKind::Manufacturer),
                ..
            }
        ));
    }

    #[test]
    fn test_retired_reference_is_dangling() {
        let mut f = fixture();
        let mut retired = live(f.mfr.clone());
        retired.retired_at = Some(Utc::now());
        f.snapshot.upsert(retired);

        let err = Validator::new(&f.snapshot, date(2026, 1, 1))
            .check(&Part::new("Y", f.mfr.id.clone()).into())
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DanglingReference { reason: DanglingReason::Retired, .. }
        ));
    }

    #[test]
    fn test_part_module_type_must_match_module() {
        let mut f = fixture();
        let module = Module::new("ECM", "M1126", f.mfr.id.clone());
        f.snapshot.upsert(live(module.clone()));
        let today = date(2026, 1, 1);

        let ok = Part::new("A", f.mfr.id.clone()).in_module(module.id.clone(), "ecm");
        assert!(Validator::new(&f.snapshot, today).check(&ok.into()).is_ok());

        let bad = Part::new("B", f.mfr.id.clone()).in_module(module.id.clone(), "APA");
        let err = Validator::new(&f.snapshot, today).check(&bad.into()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "module_type"));
    }

    #[test]
    fn test_second_primary_rejected() {
        let mut f = fixture();
        let first = CrossReference::new(f.part.id.clone(), f.mfr.id.clone()).as_primary();
        f.snapshot.upsert(live(first));

        let second = CrossReference::new(f.part.id.clone(), f.mfr.id.clone()).as_primary();
        let err = Validator::new(&f.snapshot, date(2026, 1, 1))
            .check(&second.into())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "primary"));
    }

    #[test]
    fn test_contract_must_belong_to_manufacturer() {
        let mut f = fixture();
        let other = Manufacturer::new("Other", FinancialHealth::A);
        let contract = ProcurementContract::new(other.id.clone(), date(2026, 1, 1), 10, 5.0);
        f.snapshot.upsert(live(other));
        f.snapshot.upsert(live(contract.clone()));

        let xref = CrossReference::new(f.part.id.clone(), f.mfr.id.clone())
            .under_contract(contract.id.clone());
        let err = Validator::new(&f.snapshot, date(2026, 2, 1))
            .check(&xref.into())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "contract"));
    }

    #[test]
    fn test_linked_contract_cannot_change_manufacturer() {
        let mut f = fixture();
        let other = Manufacturer::new("Other", FinancialHealth::A);
        let contract = ProcurementContract::new(f.mfr.id.clone(), date(2026, 1, 1), 10, 5.0);
        let xref = CrossReference::new(f.part.id.clone(), f.mfr.id.clone())
            .under_contract(contract.id.clone());
        f.snapshot.upsert(live(other.clone()));
        f.snapshot.upsert(live(contract.clone()));
        f.snapshot.upsert(live(xref));

        let mut moved = contract.clone();
        moved.manufacturer = other.id.clone();
        let err = Validator::new(&f.snapshot, date(2026, 2, 1))
            .check(&moved.into())
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Validation { ref field, .. } if field == "manufacturer"
        ));

        // Unlinked contracts are free to move
        let loose = ProcurementContract::new(f.mfr.id.clone(), date(2026, 1, 1), 10, 5.0);
        f.snapshot.upsert(live(loose.clone()));
        let mut loose_moved = loose;
        loose_moved.manufacturer = other.id;
        assert!(Validator::new(&f.snapshot, date(2026, 2, 1))
            .check(&loose_moved.into())
            .is_ok());
    }

    #[test]
    fn test_lapsed_contract_does_not_conflict() {
        let mut f = fixture();
        let old = ProcurementContract::new(f.mfr.id.clone(), date(2024, 1, 1), 10, 5.0)
            .with_duration(12);
        let new = ProcurementContract::new(f.mfr.id.clone(), date(2026, 1, 1), 10, 5.0);
        let first = CrossReference::new(f.part.id.clone(), f.mfr.id.clone())
            .under_contract(old.id.clone());
        f.snapshot.upsert(live(old));
        f.snapshot.upsert(live(new.clone()));
        f.snapshot.upsert(live(first));

        let second = CrossReference::new(f.part.id.clone(), f.mfr.id.clone())
            .under_contract(new.id.clone());
        assert!(Validator::new(&f.snapshot, date(2026, 6, 1))
            .check(&second.into())
            .is_ok());
    }
}
