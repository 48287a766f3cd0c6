//! `vpm mfr` command - Manufacturer management

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{
    open_store, or_dash, parse_date, parse_id, print_created, print_json, success, truncate_str,
};
use crate::cli::market_data::{self, DEFAULT_API_URL};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::FinancialHealth;
use crate::core::financials::IncomeStatement;
use crate::core::identity::EntityKind;
use crate::entities::Manufacturer;

#[derive(Subcommand, Debug)]
pub enum MfrCommands {
    /// Register a new manufacturer
    New(NewArgs),

    /// List manufacturers
    List(ListArgs),

    /// Update financials from an INCOME_STATEMENT document (file or Alpha Vantage)
    Financials(FinancialsArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Manufacturer name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Financial-health rating (A-F)
    #[arg(long, short = 'r')]
    pub rating: FinancialHealth,

    /// Headquarters or plant location
    #[arg(long)]
    pub location: Option<String>,

    /// Contact information
    #[arg(long)]
    pub contact: Option<String>,

    /// Publicly traded
    #[arg(long)]
    pub public: bool,

    /// External credit rating
    #[arg(long)]
    pub credit_rating: Option<String>,

    /// Date of the last financial review (YYYY-MM-DD)
    #[arg(long)]
    pub reviewed_on: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include retired manufacturers
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct FinancialsArgs {
    /// Manufacturer ID
    pub id: String,

    /// JSON file holding the income statement
    #[arg(long, required_unless_present = "symbol", conflicts_with = "symbol")]
    pub file: Option<PathBuf>,

    /// Ticker symbol to fetch from Alpha Vantage
    #[arg(long)]
    pub symbol: Option<String>,

    /// Alpha Vantage API key
    #[arg(long, env = "VPM_ALPHAVANTAGE_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Alpha Vantage query endpoint
    #[arg(long, env = "VPM_ALPHAVANTAGE_URL", default_value = DEFAULT_API_URL, hide = true)]
    pub api_url: String,

    /// Review date to stamp (default: today)
    #[arg(long)]
    pub reviewed_on: Option<String>,
}

/// Run a manufacturer subcommand
pub fn run(cmd: MfrCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MfrCommands::New(args) => run_new(args, global),
        MfrCommands::List(args) => run_list(args, global),
        MfrCommands::Financials(args) => run_financials(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;

    let mut mfr = Manufacturer::new(args.name, args.rating);
    mfr.location = args.location;
    mfr.contact = args.contact;
    mfr.public = args.public;
    mfr.credit_rating = args.credit_rating;
    if let Some(ref raw) = args.reviewed_on {
        mfr = mfr.reviewed_on(parse_date(raw)?);
    }

    let id = store.create(mfr)?;
    print_created(global, &id, "manufacturer")
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let snapshot = store.snapshot();

    let rows: Vec<(&Manufacturer, bool)> = snapshot
        .iter_kind(EntityKind::Manufacturer)
        .filter(|s| args.all || s.is_live())
        .filter_map(|s| s.as_entity::<Manufacturer>().map(|m| (m, !s.is_live())))
        .collect();

    match global.format {
        OutputFormat::Json => {
            let mfrs: Vec<&Manufacturer> = rows.iter().map(|(m, _)| *m).collect();
            print_json(&mfrs)
        }
        OutputFormat::Table => {
            let mut table = Table::new(["ID", "NAME", "RATING", "LOCATION", "REVIEWED", "STATE"]);
            for (m, retired) in &rows {
                table.push([
                    m.id.to_string(),
                    truncate_str(&m.name, 30),
                    m.financial_health.to_string(),
                    or_dash(m.location.as_deref()),
                    or_dash(m.last_financial_review),
                    if *retired { "retired" } else { "live" }.to_string(),
                ]);
            }
            table.print("manufacturer", "No manufacturers found.", global.quiet);
            Ok(())
        }
    }
}

fn run_financials(args: FinancialsArgs, global: &GlobalOpts) -> Result<()> {
    let id = parse_id(&args.id, EntityKind::Manufacturer)?;
    let text = match (&args.file, &args.symbol) {
        (Some(path), _) => std::fs::read_to_string(path).into_diagnostic()?,
        (None, Some(symbol)) => {
            let Some(ref api_key) = args.api_key else {
                return Err(miette::miette!(
                    "An API key is required to fetch financials. Pass --api-key or set VPM_ALPHAVANTAGE_KEY"
                ));
            };
            market_data::fetch_income_statement(&args.api_url, symbol, api_key)?
        }
        (None, None) => return Err(miette::miette!("Pass --file or --symbol")),
    };
    let statement = IncomeStatement::from_json(&text)?;

    let (store, _) = open_store(global)?;
    let reviewed_on = match args.reviewed_on {
        Some(ref raw) => parse_date(raw)?,
        None => store.today(),
    };
    let version = store.update(&id, &statement.to_patch(reviewed_on))?;

    match global.format {
        OutputFormat::Json => {
            let mfr: Manufacturer = store.get_as(&id)?;
            print_json(&mfr)
        }
        OutputFormat::Table => {
            let fiscal = statement
                .latest()
                .map(|r| r.fiscal_date_ending.to_string())
                .unwrap_or_default();
            success(
                global,
                format!(
                    "Updated financials of {} from fiscal year ending {} (version {})",
                    id, fiscal, version
                ),
            );
            Ok(())
        }
    }
}
