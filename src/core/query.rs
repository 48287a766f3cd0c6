//! Query/reporting facade - read-only projections over a snapshot
//!
//! Queries hold their own `Arc` of the snapshot they were issued against,
//! so results are unaffected by later commits and re-issuing a query against
//! the same snapshot yields the same rows in the same order. Rows come back
//! in identity order unless another sort is requested; identity-ordered
//! queries walk the snapshot with a cursor instead of collecting results.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::entity::{Criticality, Entity, FinancialHealth, OperationalStatus};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::record::StoredRecord;
use crate::core::snapshot::CatalogSnapshot;
use crate::entities::{CrossReference, Manufacturer, Module, Part, ProcurementContract};

type Projection<T> = Box<dyn Fn(&CatalogSnapshot, &StoredRecord) -> Option<T>>;

/// Walks one entity kind in identity order, projecting matching records
pub struct Cursor<T> {
    snapshot: Arc<CatalogSnapshot>,
    kind: EntityKind,
    last: Option<EntityId>,
    project: Projection<T>,
}

impl<T> Iterator for Cursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let record = self.snapshot.next_after(self.kind, self.last.as_ref())?;
            self.last = Some(record.id().clone());
            if let Some(row) = (self.project)(&self.snapshot, record) {
                return Some(row);
            }
        }
    }
}

/// Result rows of a facade query
pub enum Rows<T> {
    /// Produced on demand in identity order
    Lazy(Cursor<T>),
    /// Collected up front for an explicit sort
    Sorted(std::vec::IntoIter<T>),
}

impl<T> Iterator for Rows<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self {
            Rows::Lazy(cursor) => cursor.next(),
            Rows::Sorted(rows) => rows.next(),
        }
    }
}

/// Sort order for part queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartSort {
    /// Identity ascending
    #[default]
    Identity,
    /// Largest shortfall below threshold first
    Shortfall,
    /// Cheapest first; parts without a cost last
    UnitCost,
}

/// Filters for [`Facade::parts`]
#[derive(Debug, Clone, Default)]
pub struct PartQuery {
    pub below_threshold: bool,
    pub rated_below: Option<FinancialHealth>,
    pub module_type: Option<String>,
    pub min_criticality: Option<Criticality>,
    pub include_retired: bool,
    pub sort: PartSort,
}

impl PartQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn below_threshold(mut self) -> Self {
        self.below_threshold = true;
        self
    }

    /// Only parts whose manufacturer is rated strictly worse than `rating`
    pub fn rated_below(mut self, rating: FinancialHealth) -> Self {
        self.rated_below = Some(rating);
        self
    }

    pub fn module_type(mut self, tag: impl Into<String>) -> Self {
        self.module_type = Some(tag.into());
        self
    }

    pub fn min_criticality(mut self, criticality: Criticality) -> Self {
        self.min_criticality = Some(criticality);
        self
    }

    pub fn include_retired(mut self) -> Self {
        self.include_retired = true;
        self
    }

    pub fn sort_by(mut self, sort: PartSort) -> Self {
        self.sort = sort;
        self
    }

    fn matches(&self, snapshot: &CatalogSnapshot, stored: &StoredRecord, part: &Part) -> bool {
        if !self.include_retired && !stored.is_live() {
            return false;
        }
        if self.below_threshold && shortfall(part).is_none() {
            return false;
        }
        if let Some(ref tag) = self.module_type {
            if !part
                .module_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(tag))
            {
                return false;
            }
        }
        if let Some(min) = self.min_criticality {
            if part.criticality < min {
                return false;
            }
        }
        if let Some(rating) = self.rated_below {
            let below = snapshot
                .entity::<Manufacturer>(&part.manufacturer)
                .is_some_and(|m| m.financial_health.is_below(rating));
            if !below {
                return false;
            }
        }
        true
    }
}

/// How far stock sits below the reorder threshold (0 = exactly at it)
fn shortfall(part: &Part) -> Option<i64> {
    part.reorder_threshold
        .filter(|t| part.stock_level <= *t)
        .map(|t| t - part.stock_level)
}

/// One row of a part query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartRow {
    pub part: Part,
    pub retired: bool,
    pub manufacturer_name: Option<String>,
    pub manufacturer_rating: Option<FinancialHealth>,
    pub shortfall: Option<i64>,
}

/// A manufacturer whose financial review is overdue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaleReview {
    pub manufacturer: Manufacturer,
    /// None if never reviewed
    pub days_since_review: Option<i64>,
}

/// Read-only queries against one snapshot
#[derive(Debug, Clone)]
pub struct Facade {
    snapshot: Arc<CatalogSnapshot>,
}

impl Facade {
    pub fn new(snapshot: Arc<CatalogSnapshot>) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    fn cursor<T: 'static>(
        &self,
        kind: EntityKind,
        project: impl Fn(&CatalogSnapshot, &StoredRecord) -> Option<T> + 'static,
    ) -> Cursor<T> {
        Cursor {
            snapshot: Arc::clone(&self.snapshot),
            kind,
            last: None,
            project: Box::new(project),
        }
    }

    /// Live entities of type `E` referencing `target`, in identity order
    fn live_referrers<E: Entity>(&self, target: &EntityId) -> Vec<E> {
        self.snapshot
            .referrers(target)
            .filter(|r| r.is_live())
            .filter_map(|r| r.as_entity::<E>())
            .cloned()
            .collect()
    }

    /// Parts matching the query
    pub fn parts(&self, query: PartQuery) -> Rows<PartRow> {
        let sort = query.sort;
        let cursor = self.cursor(EntityKind::Part, move |snapshot, stored| {
            let part = stored.as_entity::<Part>()?;
            if !query.matches(snapshot, stored, part) {
                return None;
            }
            let manufacturer = snapshot.entity::<Manufacturer>(&part.manufacturer);
            Some(PartRow {
                part: part.clone(),
                retired: !stored.is_live(),
                manufacturer_name: manufacturer.map(|m| m.name.clone()),
                manufacturer_rating: manufacturer.map(|m| m.financial_health),
                shortfall: shortfall(part),
            })
        });

        match sort {
            PartSort::Identity => Rows::Lazy(cursor),
            PartSort::Shortfall => {
                let mut rows: Vec<PartRow> = cursor.collect();
                rows.sort_by(|a, b| {
                    b.shortfall
                        .cmp(&a.shortfall)
                        .then_with(|| a.part.id.cmp(&b.part.id))
                });
                Rows::Sorted(rows.into_iter())
            }
            PartSort::UnitCost => {
                let mut rows: Vec<PartRow> = cursor.collect();
                rows.sort_by(|a, b| {
                    compare_cost(a.part.unit_cost, b.part.unit_cost)
                        .then_with(|| a.part.id.cmp(&b.part.id))
                });
                Rows::Sorted(rows.into_iter())
            }
        }
    }

    /// Live modules for a vehicle class that are under review
    ///
    /// `vehicle` is matched case-insensitively against the installation
    /// environment and the model.
    pub fn modules_needing_maintenance(&self, vehicle: &str) -> Rows<Module> {
        let needle = vehicle.to_lowercase();
        Rows::Lazy(self.cursor(EntityKind::Module, move |_, stored| {
            let module = stored.as_entity::<Module>()?;
            let on_vehicle = module
                .installation_environment
                .iter()
                .chain(std::iter::once(&module.model))
                .any(|text| text.to_lowercase().contains(&needle));
            (stored.is_live() && on_vehicle && module.status == OperationalStatus::UnderReview)
                .then(|| module.clone())
        }))
    }

    /// Live manufacturers never reviewed or reviewed more than
    /// `max_age_days` before `today`
    pub fn stale_financial_reviews(&self, max_age_days: i64, today: NaiveDate) -> Rows<StaleReview> {
        Rows::Lazy(self.cursor(EntityKind::Manufacturer, move |_, stored| {
            let mfr = stored.as_entity::<Manufacturer>()?;
            if !stored.is_live() {
                return None;
            }
            let age = mfr
                .last_financial_review
                .map(|reviewed| (today - reviewed).num_days());
            match age {
                Some(days) if days <= max_age_days => None,
                _ => Some(StaleReview {
                    manufacturer: mfr.clone(),
                    days_since_review: age,
                }),
            }
        }))
    }

    /// Live cross-references sourcing a part
    pub fn sourcing(&self, part: &EntityId) -> Rows<CrossReference> {
        let rows: Vec<CrossReference> = self
            .live_referrers::<CrossReference>(part)
            .into_iter()
            .filter(|x| x.part == *part)
            .collect();
        Rows::Sorted(rows.into_iter())
    }

    /// Live contracts naming a manufacturer, module or part
    pub fn contracts_for(&self, entity: &EntityId) -> Rows<ProcurementContract> {
        Rows::Sorted(
            self.live_referrers::<ProcurementContract>(entity)
                .into_iter(),
        )
    }
}

fn compare_cost(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
