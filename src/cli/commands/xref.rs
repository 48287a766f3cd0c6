//! `vpm xref` command - Manufacturer cross-references

use clap::Subcommand;
use miette::Result;

use crate::cli::helpers::{open_store, or_dash, parse_date, parse_id, print_created, print_json};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityKind;
use crate::core::query::Facade;
use crate::entities::CrossReference;

#[derive(Subcommand, Debug)]
pub enum XrefCommands {
    /// Record how a manufacturer sources a part
    New(NewArgs),

    /// Show the sourcing rows of a part
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Part ID
    #[arg(long)]
    pub part: String,

    /// Manufacturer ID
    #[arg(long)]
    pub manufacturer: String,

    /// Governing contract ID
    #[arg(long)]
    pub contract: Option<String>,

    /// Mark as the primary source for this part and manufacturer
    #[arg(long)]
    pub primary: bool,

    /// Units the manufacturer holds for us
    #[arg(long, default_value_t = 0)]
    pub on_hand: i64,

    #[arg(long)]
    pub base_price: Option<f64>,

    #[arg(long)]
    pub expedited_price: Option<f64>,

    #[arg(long)]
    pub lead_time_days: Option<u32>,

    #[arg(long)]
    pub expedited_lead_time_days: Option<u32>,

    /// Next production run (YYYY-MM-DD)
    #[arg(long)]
    pub next_production: Option<String>,

    #[arg(long)]
    pub next_production_quantity: Option<i64>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Part ID
    pub part: String,
}

pub fn run(cmd: XrefCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        XrefCommands::New(args) => run_new(args, global),
        XrefCommands::List(args) => run_list(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let part = parse_id(&args.part, EntityKind::Part)?;
    let manufacturer = parse_id(&args.manufacturer, EntityKind::Manufacturer)?;

    let mut xref = CrossReference::new(part, manufacturer);
    if let Some(ref raw) = args.contract {
        xref = xref.under_contract(parse_id(raw, EntityKind::Contract)?);
    }
    if args.primary {
        xref = xref.as_primary();
    }
    xref.on_hand = args.on_hand;
    xref.base_price = args.base_price;
    xref.expedited_price = args.expedited_price;
    xref.lead_time_days = args.lead_time_days;
    xref.expedited_lead_time_days = args.expedited_lead_time_days;
    xref.next_production_date = args.next_production.as_deref().map(parse_date).transpose()?;
    xref.next_production_quantity = args.next_production_quantity;

    let (store, _) = open_store(global)?;
    let id = store.create(xref)?;
    print_created(global, &id, "cross-reference")
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let part = parse_id(&args.part, EntityKind::Part)?;
    let (store, _) = open_store(global)?;
    let rows: Vec<CrossReference> = Facade::new(store.snapshot()).sourcing(&part).collect();

    match global.format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new([
                "ID",
                "MANUFACTURER",
                "CONTRACT",
                "PRIMARY",
                "ON HAND",
                "BASE PRICE",
                "LEAD TIME",
            ]);
            for x in &rows {
                table.push([
                    x.id.to_string(),
                    x.manufacturer.to_string(),
                    or_dash(x.contract.as_ref()),
                    if x.primary { "yes" } else { "" }.to_string(),
                    x.on_hand.to_string(),
                    or_dash(x.base_price.map(|p| format!("{:.2}", p))),
                    or_dash(x.lead_time_days.map(|d| format!("{}d", d))),
                ]);
            }
            table.print("cross-reference", "No cross-references found.", global.quiet);
            Ok(())
        }
    }
}
