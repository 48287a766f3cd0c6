//! `vpm query` command - Catalog reports

use clap::{Subcommand, ValueEnum};
use miette::Result;

use crate::cli::helpers::{open_store, or_dash, print_json, truncate_str};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::{Criticality, FinancialHealth};
use crate::core::query::{Facade, PartQuery, PartRow, PartSort, StaleReview};
use crate::entities::Module;

#[derive(Subcommand, Debug)]
pub enum QueryCommands {
    /// Parts at or below their reorder threshold
    BelowThreshold(BelowThresholdArgs),

    /// Modules under review for a vehicle
    Maintenance(MaintenanceArgs),

    /// Manufacturers whose financial review is overdue
    StaleReviews(StaleReviewsArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Id,
    Shortfall,
    Cost,
}

impl From<SortArg> for PartSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Id => PartSort::Identity,
            SortArg::Shortfall => PartSort::Shortfall,
            SortArg::Cost => PartSort::UnitCost,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct BelowThresholdArgs {
    /// Only parts whose manufacturer is rated below this (e.g. B)
    #[arg(long)]
    pub rated_below: Option<FinancialHealth>,

    /// Only parts of this module type
    #[arg(long = "type", short = 't')]
    pub module_type: Option<String>,

    /// Only parts at least this critical
    #[arg(long)]
    pub min_criticality: Option<Criticality>,

    #[arg(long, default_value = "id")]
    pub sort: SortArg,
}

#[derive(clap::Args, Debug)]
pub struct MaintenanceArgs {
    /// Vehicle name matched against module environment and model
    pub vehicle: String,
}

#[derive(clap::Args, Debug)]
pub struct StaleReviewsArgs {
    /// Maximum review age in days (default: stale_review_days from config)
    #[arg(long)]
    pub days: Option<i64>,
}

pub fn run(cmd: QueryCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        QueryCommands::BelowThreshold(args) => run_below_threshold(args, global),
        QueryCommands::Maintenance(args) => run_maintenance(args, global),
        QueryCommands::StaleReviews(args) => run_stale_reviews(args, global),
    }
}

fn run_below_threshold(args: BelowThresholdArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;

    let mut query = PartQuery::new().below_threshold().sort_by(args.sort.into());
    if let Some(rating) = args.rated_below {
        query = query.rated_below(rating);
    }
    if let Some(tag) = args.module_type {
        query = query.module_type(tag);
    }
    if let Some(criticality) = args.min_criticality {
        query = query.min_criticality(criticality);
    }

    let rows = Facade::new(store.snapshot()).parts(query);
    match global.format {
        OutputFormat::Json => print_json(&rows.collect::<Vec<PartRow>>()),
        OutputFormat::Table => {
            let mut table = Table::new([
                "ID",
                "MODEL",
                "TYPE",
                "MANUFACTURER",
                "RATING",
                "STOCK",
                "THRESHOLD",
                "SHORTFALL",
            ]);
            for row in rows {
                let p = &row.part;
                table.push([
                    p.id.to_string(),
                    truncate_str(&p.model, 24),
                    or_dash(p.module_type.as_deref()),
                    or_dash(row.manufacturer_name.as_deref().map(|n| truncate_str(n, 24))),
                    or_dash(row.manufacturer_rating),
                    p.stock_level.to_string(),
                    or_dash(p.reorder_threshold),
                    or_dash(row.shortfall),
                ]);
            }
            table.print("part", "No parts below threshold.", global.quiet);
            Ok(())
        }
    }
}

fn run_maintenance(args: MaintenanceArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let modules: Vec<Module> = Facade::new(store.snapshot())
        .modules_needing_maintenance(&args.vehicle)
        .collect();

    match global.format {
        OutputFormat::Json => print_json(&modules),
        OutputFormat::Table => {
            let mut table = Table::new(["ID", "TYPE", "MODEL", "ENVIRONMENT", "CRITICALITY"]);
            for m in &modules {
                table.push([
                    m.id.to_string(),
                    m.module_type.clone(),
                    truncate_str(&m.model, 24),
                    or_dash(m.installation_environment.as_deref()),
                    m.criticality.to_string(),
                ]);
            }
            table.print(
                "module",
                &format!("No modules under review for '{}'.", args.vehicle),
                global.quiet,
            );
            Ok(())
        }
    }
}

fn run_stale_reviews(args: StaleReviewsArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let days = args.days.unwrap_or_else(|| config.stale_review_days());
    let rows: Vec<StaleReview> = Facade::new(store.snapshot())
        .stale_financial_reviews(days, store.today())
        .collect();

    match global.format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new(["ID", "NAME", "RATING", "LAST REVIEW", "DAYS"]);
            for row in &rows {
                let m = &row.manufacturer;
                table.push([
                    m.id.to_string(),
                    truncate_str(&m.name, 30),
                    m.financial_health.to_string(),
                    or_dash(m.last_financial_review),
                    row.days_since_review
                        .map_or_else(|| "never".to_string(), |d| d.to_string()),
                ]);
            }
            table.print(
                "manufacturer",
                &format!("No financial reviews older than {} days.", days),
                global.quiet,
            );
            Ok(())
        }
    }
}
