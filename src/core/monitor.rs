//! Reorder/lifecycle monitor
//!
//! Derives alerts from a catalog snapshot and a point in time. Evaluation
//! owns no state, so re-running it against the same snapshot and time
//! yields the same alert set.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::core::audit::AuditRecord;
use crate::core::entity::{Criticality, FinancialHealth};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::Record;
use crate::core::snapshot::CatalogSnapshot;
use crate::entities::{
    CrossReference, Manufacturer, Module, Part, ProcurementContract, QualityCertification,
};

/// An actionable state derived from the catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "alert", rename_all = "snake_case")]
pub enum Alert {
    /// Stock of a part or module is at or below its reorder threshold
    ReorderNeeded {
        entity: EntityId,
        stock_level: i64,
        reorder_threshold: i64,
        recommended_quantity: i64,
    },

    /// The part's newest certification has lapsed
    CertificationExpired {
        part: EntityId,
        certification: EntityId,
        valid_until: NaiveDate,
    },

    /// A contract's term has ended but it is still the primary sourcing
    /// arrangement for at least one cross-reference
    ContractExpiringUnrenewed {
        contract: EntityId,
        ended_on: NaiveDate,
        primary_cross_references: Vec<EntityId>,
    },

    /// A distressed manufacturer supplies a mission-critical part or module
    SupplyRiskCritical {
        manufacturer: EntityId,
        rating: FinancialHealth,
        entity: EntityId,
    },
}

impl Alert {
    /// Short machine name of the alert kind
    pub fn label(&self) -> &'static str {
        match self {
            Alert::ReorderNeeded { .. } => "reorder_needed",
            Alert::CertificationExpired { .. } => "certification_expired",
            Alert::ContractExpiringUnrenewed { .. } => "contract_expiring_unrenewed",
            Alert::SupplyRiskCritical { .. } => "supply_risk_critical",
        }
    }

    /// The entity the alert is about
    pub fn subject(&self) -> &EntityId {
        match self {
            Alert::ReorderNeeded { entity, .. } => entity,
            Alert::CertificationExpired { part, .. } => part,
            Alert::ContractExpiringUnrenewed { contract, .. } => contract,
            Alert::SupplyRiskCritical { entity, .. } => entity,
        }
    }

    /// Every entity the alert mentions
    pub fn mentions(&self) -> Vec<&EntityId> {
        match self {
            Alert::ReorderNeeded { entity, .. } => vec![entity],
            Alert::CertificationExpired {
                part,
                certification,
                ..
            } => vec![part, certification],
            Alert::ContractExpiringUnrenewed {
                contract,
                primary_cross_references,
                ..
            } => std::iter::once(contract)
                .chain(primary_cross_references.iter())
                .collect(),
            Alert::SupplyRiskCritical {
                manufacturer,
                entity,
                ..
            } => vec![manufacturer, entity],
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::ReorderNeeded {
                entity,
                stock_level,
                reorder_threshold,
                recommended_quantity,
            } => write!(
                f,
                "{} stock {} <= threshold {}; order {}",
                entity, stock_level, reorder_threshold, recommended_quantity
            ),
            Alert::CertificationExpired {
                part,
                certification,
                valid_until,
            } => write!(
                f,
                "{} certification {} expired {}",
                part, certification, valid_until
            ),
            Alert::ContractExpiringUnrenewed {
                contract,
                ended_on,
                primary_cross_references,
            } => write!(
                f,
                "{} ended {} but is primary for {} cross-reference(s)",
                contract,
                ended_on,
                primary_cross_references.len()
            ),
            Alert::SupplyRiskCritical {
                manufacturer,
                rating,
                entity,
            } => write!(
                f,
                "{} (rated {}) supplies mission-critical {}",
                manufacturer, rating, entity
            ),
        }
    }
}

/// Order quantity for a shortfall: `2 x (threshold - level + 1)`
pub fn recommended_quantity(stock_level: i64, reorder_threshold: i64) -> i64 {
    reorder_threshold
        .saturating_sub(stock_level)
        .saturating_add(1)
        .saturating_mul(2)
}

fn reorder_alert(entity: &EntityId, level: i64, threshold: Option<i64>) -> Option<Alert> {
    let threshold = threshold?;
    (level <= threshold).then(|| Alert::ReorderNeeded {
        entity: entity.clone(),
        stock_level: level,
        reorder_threshold: threshold,
        recommended_quantity: recommended_quantity(level, threshold),
    })
}

/// Every alert the snapshot raises at `now`
pub fn evaluate(snapshot: &CatalogSnapshot, now: DateTime<Utc>) -> BTreeSet<Alert> {
    let today = now.date_naive();
    let mut alerts = BTreeSet::new();

    stock_alerts(snapshot, &mut alerts);
    certification_alerts(snapshot, today, &mut alerts);
    contract_alerts(snapshot, today, &mut alerts);
    supply_risk_alerts(snapshot, today, &mut alerts);

    tracing::debug!(count = alerts.len(), %today, "monitor evaluated");
    alerts
}

/// Alerts that concern any entity touched by the given audit records
///
/// A touched certification or cross-reference also counts as touching its
/// part.
pub fn evaluate_changes(
    snapshot: &CatalogSnapshot,
    changes: &[AuditRecord],
    now: DateTime<Utc>,
) -> BTreeSet<Alert> {
    let mut touched: BTreeSet<&EntityId> = BTreeSet::new();
    for change in changes {
        touched.insert(&change.entity);
        match change.entity.kind() {
            EntityKind::Certification => {
                if let Some(cert) = snapshot.entity::<QualityCertification>(&change.entity) {
                    touched.insert(&cert.part);
                }
            }
            EntityKind::CrossReference => {
                if let Some(xref) = snapshot.entity::<CrossReference>(&change.entity) {
                    touched.insert(&xref.part);
                }
            }
            _ => {}
        }
    }

    evaluate(snapshot, now)
        .into_iter()
        .filter(|alert| alert.mentions().iter().any(|id| touched.contains(id)))
        .collect()
}

fn stock_alerts(snapshot: &CatalogSnapshot, alerts: &mut BTreeSet<Alert>) {
    for part in snapshot.live::<Part>() {
        alerts.extend(reorder_alert(&part.id, part.stock_level, part.reorder_threshold));
    }
    for module in snapshot.live::<Module>() {
        alerts.extend(reorder_alert(
            &module.id,
            module.stock_count,
            module.reorder_threshold,
        ));
    }
}

fn certification_alerts(
    snapshot: &CatalogSnapshot,
    today: NaiveDate,
    alerts: &mut BTreeSet<Alert>,
) {
    for part in snapshot.live::<Part>() {
        let newest = snapshot
            .referrers(&part.id)
            .filter(|r| r.is_live())
            .filter_map(|r| r.as_entity::<QualityCertification>())
            .max_by(|a, b| (a.valid_until, &a.id).cmp(&(b.valid_until, &b.id)));

        if let Some(cert) = newest.filter(|c| c.is_expired(today)) {
            alerts.insert(Alert::CertificationExpired {
                part: part.id.clone(),
                certification: cert.id.clone(),
                valid_until: cert.valid_until,
            });
        }
    }
}

fn contract_alerts(snapshot: &CatalogSnapshot, today: NaiveDate, alerts: &mut BTreeSet<Alert>) {
    for contract in snapshot.live::<ProcurementContract>() {
        let Some(ended_on) = contract.end_date().filter(|end| *end < today) else {
            continue;
        };

        let primaries: Vec<EntityId> = snapshot
            .referrers(&contract.id)
            .filter(|r| r.is_live())
            .filter_map(|r| r.as_entity::<CrossReference>())
            .filter(|x| x.primary && x.contract.as_ref() == Some(&contract.id))
            .map(|x| x.id.clone())
            .collect();

        if !primaries.is_empty() {
            alerts.insert(Alert::ContractExpiringUnrenewed {
                contract: contract.id.clone(),
                ended_on,
                primary_cross_references: primaries,
            });
        }
    }
}

/// Distressed manufacturers linked to live mission-critical parts or
/// modules: as direct manufacturer, through a cross-reference, or through a
/// contract still in term
fn supply_risk_alerts(snapshot: &CatalogSnapshot, today: NaiveDate, alerts: &mut BTreeSet<Alert>) {
    let mission_critical = |id: &EntityId| -> bool {
        snapshot
            .live_entity::<Part>(id)
            .map(|p| p.criticality)
            .or_else(|| snapshot.live_entity::<Module>(id).map(|m| m.criticality))
            .is_some_and(|c| c == Criticality::MissionCritical)
    };

    for mfr in snapshot
        .live::<Manufacturer>()
        .filter(|m| m.financial_health.is_distressed())
    {
        for referrer in snapshot.referrers(&mfr.id).filter(|r| r.is_live()) {
            let supplied: Vec<&EntityId> = match &referrer.record {
                Record::Part(part) => vec![&part.id],
                Record::Module(module) => vec![&module.id],
                Record::CrossReference(xref) => vec![&xref.part],
                Record::Contract(contract) if contract.in_term(today) => {
                    contract.part.iter().chain(contract.module.iter()).collect()
                }
                _ => Vec::new(),
            };

            for entity in supplied.into_iter().filter(|id| mission_critical(*id)) {
                alerts.insert(Alert::SupplyRiskCritical {
                    manufacturer: mfr.id.clone(),
                    rating: mfr.financial_health,
                    entity: entity.clone(),
                });
            }
        }
    }
}
