//! Bulk procurement-contract import from CSV
//!
//! Each row becomes one independent `create`. Rows committed before a
//! failure stay committed; the report tells the caller what to compensate.

use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::clock::Clock;
use crate::core::entity::PriceRisk;
use crate::core::error::CatalogError;
use crate::core::identity::EntityId;
use crate::core::persistence::Persistence;
use crate::core::store::CatalogStore;
use crate::entities::ProcurementContract;

/// Header row accepted by [`import_contracts`], in template order
pub const CONTRACT_COLUMNS: [&str; 9] = [
    "manufacturer",
    "module",
    "part",
    "contract_date",
    "quantity",
    "unit_price",
    "delivery_terms",
    "duration_months",
    "price_volatility_risk",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Stop at the first failing row instead of continuing
    pub stop_on_error: bool,
}

/// A row that could not be imported
#[derive(Debug)]
pub struct RowFailure {
    /// 1-based line number in the file (the header is line 1)
    pub row: usize,
    pub error: CatalogError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub rows_processed: usize,
    pub created: Vec<EntityId>,
    pub failures: Vec<RowFailure>,
    /// True when `stop_on_error` cut the import short
    pub stopped: bool,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Serializable view of a report for `--format json`
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub rows_processed: usize,
    pub created: Vec<String>,
    pub failures: Vec<FailureSummary>,
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
pub struct FailureSummary {
    pub row: usize,
    pub error: String,
}

impl From<&ImportReport> for ImportSummary {
    fn from(report: &ImportReport) -> Self {
        Self {
            rows_processed: report.rows_processed,
            created: report.created.iter().map(ToString::to_string).collect(),
            failures: report
                .failures
                .iter()
                .map(|f| FailureSummary {
                    row: f.row,
                    error: f.error.to_string(),
                })
                .collect(),
            stopped: report.stopped,
        }
    }
}

struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_lowercase(), i))
                .collect(),
        )
    }

    fn get<'r>(&self, record: &'r StringRecord, field: &str) -> Option<&'r str> {
        self.0
            .get(field)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn require<'r>(&self, record: &'r StringRecord, field: &str) -> Result<&'r str, CatalogError> {
        self.get(record, field)
            .ok_or_else(|| CatalogError::validation(None, field, "required column is empty"))
    }
}

fn parse_with<T, E: std::fmt::Display>(
    field: &str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, CatalogError> {
    parse(raw).map_err(|e| CatalogError::validation(None, field, format!("'{}': {}", raw, e)))
}

fn contract_from_row(
    columns: &Columns,
    record: &StringRecord,
) -> Result<ProcurementContract, CatalogError> {
    let manufacturer = parse_with(
        "manufacturer",
        columns.require(record, "manufacturer")?,
        EntityId::parse,
    )?;
    let contract_date = parse_with(
        "contract_date",
        columns.require(record, "contract_date")?,
        |s| NaiveDate::parse_from_str(s, "%Y-%m-%d"),
    )?;
    let quantity = parse_with("quantity", columns.require(record, "quantity")?, str::parse::<i64>)?;
    let unit_price = parse_with(
        "unit_price",
        columns.require(record, "unit_price")?,
        str::parse::<f64>,
    )?;

    let mut contract = ProcurementContract::new(manufacturer, contract_date, quantity, unit_price);
    if let Some(raw) = columns.get(record, "module") {
        contract = contract.for_module(parse_with("module", raw, EntityId::parse)?);
    }
    if let Some(raw) = columns.get(record, "part") {
        contract = contract.for_part(parse_with("part", raw, EntityId::parse)?);
    }
    if let Some(raw) = columns.get(record, "duration_months") {
        contract = contract.with_duration(parse_with("duration_months", raw, str::parse::<u32>)?);
    }
    if let Some(raw) = columns.get(record, "price_volatility_risk") {
        contract.price_volatility_risk =
            parse_with("price_volatility_risk", raw, str::parse::<PriceRisk>)?;
    }
    contract.delivery_terms = columns.get(record, "delivery_terms").map(str::to_string);
    Ok(contract)
}

/// Import contracts from CSV text, one `create` per data row
///
/// Only an unreadable header is fatal; every other problem is reported per
/// row.
pub fn import_contracts<P, C, R>(
    store: &CatalogStore<P, C>,
    reader: R,
    options: ImportOptions,
) -> Result<ImportReport, CatalogError>
where
    P: Persistence,
    C: Clock,
    R: Read,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| CatalogError::validation(None, "header", e.to_string()))?
        .clone();
    let columns = Columns::new(&headers);
    for required in ["manufacturer", "contract_date", "quantity", "unit_price"] {
        if !columns.0.contains_key(required) {
            return Err(CatalogError::validation(
                None,
                "header",
                format!("missing column '{}'", required),
            ));
        }
    }

    let mut report = ImportReport::default();
    for (row_idx, result) in rdr.records().enumerate() {
        let row = row_idx + 2;
        report.rows_processed += 1;

        let outcome = result
            .map_err(|e| CatalogError::validation(None, "row", e.to_string()))
            .and_then(|record| contract_from_row(&columns, &record))
            .and_then(|contract| store.create(contract));

        match outcome {
            Ok(id) => {
                debug!(row, %id, "imported contract");
                report.created.push(id);
            }
            Err(error) => {
                debug!(row, %error, "contract row rejected");
                report.failures.push(RowFailure { row, error });
                if options.stop_on_error {
                    report.stopped = true;
                    break;
                }
            }
        }
    }

    info!(
        rows = report.rows_processed,
        created = report.created.len(),
        failed = report.failures.len(),
        stopped = report.stopped,
        "contract import finished"
    );
    Ok(report)
}
