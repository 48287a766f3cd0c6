//! `vpm contract` command - Procurement contract management

use clap::Subcommand;
use miette::Result;

use crate::cli::helpers::{open_store, or_dash, parse_any_id, parse_date, parse_id, print_created, print_json};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::PriceRisk;
use crate::core::identity::EntityKind;
use crate::core::query::Facade;
use crate::entities::ProcurementContract;

#[derive(Subcommand, Debug)]
pub enum ContractCommands {
    /// Create a procurement contract
    New(NewArgs),

    /// List live contracts, optionally for one manufacturer, module or part
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Contracted manufacturer ID
    #[arg(long)]
    pub manufacturer: String,

    /// Contracted module ID
    #[arg(long)]
    pub module: Option<String>,

    /// Contracted part ID
    #[arg(long)]
    pub part: Option<String>,

    /// Contract start date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,

    #[arg(long)]
    pub quantity: i64,

    #[arg(long)]
    pub unit_price: f64,

    /// Term in months (omit for open-ended)
    #[arg(long)]
    pub months: Option<u32>,

    #[arg(long)]
    pub delivery_terms: Option<String>,

    /// Price volatility risk (low, moderate, high, severe)
    #[arg(long, default_value = "low")]
    pub price_risk: PriceRisk,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Manufacturer, module or part ID
    #[arg(long = "for")]
    pub entity: Option<String>,
}

pub fn run(cmd: ContractCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ContractCommands::New(args) => run_new(args, global),
        ContractCommands::List(args) => run_list(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let manufacturer = parse_id(&args.manufacturer, EntityKind::Manufacturer)?;
    let date = parse_date(&args.date)?;

    let mut contract = ProcurementContract::new(manufacturer, date, args.quantity, args.unit_price);
    if let Some(ref raw) = args.module {
        contract = contract.for_module(parse_id(raw, EntityKind::Module)?);
    }
    if let Some(ref raw) = args.part {
        contract = contract.for_part(parse_id(raw, EntityKind::Part)?);
    }
    if let Some(months) = args.months {
        contract = contract.with_duration(months);
    }
    contract.delivery_terms = args.delivery_terms;
    contract.price_volatility_risk = args.price_risk;

    let (store, _) = open_store(global)?;
    let id = store.create(contract)?;
    print_created(global, &id, "contract")
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let entity = args.entity.as_deref().map(parse_any_id).transpose()?;
    let (store, _) = open_store(global)?;
    let today = store.today();
    let snapshot = store.snapshot();

    let contracts: Vec<ProcurementContract> = match entity {
        Some(ref id) => Facade::new(snapshot).contracts_for(id).collect(),
        None => snapshot.live::<ProcurementContract>().cloned().collect(),
    };

    match global.format {
        OutputFormat::Json => print_json(&contracts),
        OutputFormat::Table => {
            let mut table = Table::new([
                "ID",
                "MANUFACTURER",
                "START",
                "END",
                "QTY",
                "UNIT PRICE",
                "RISK",
                "STATE",
            ]);
            for c in &contracts {
                table.push([
                    c.id.to_string(),
                    c.manufacturer.to_string(),
                    c.contract_date.to_string(),
                    or_dash(c.end_date()),
                    c.quantity.to_string(),
                    format!("{:.2}", c.unit_price),
                    c.price_volatility_risk.to_string(),
                    if c.in_term(today) { "active" } else { "ended" }.to_string(),
                ]);
            }
            table.print("contract", "No contracts found.", global.quiet);
            Ok(())
        }
    }
}
