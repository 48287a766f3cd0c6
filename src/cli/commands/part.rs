//! `vpm part` command - Part management

use clap::Subcommand;
use miette::Result;
use serde_json::Value;

use crate::cli::helpers::{open_store, or_dash, parse_id, print_created, print_json, truncate_str};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Criticality;
use crate::core::identity::EntityKind;
use crate::core::query::{Facade, PartQuery};
use crate::entities::Part;

#[derive(Subcommand, Debug)]
pub enum PartCommands {
    /// Create a new part
    New(NewArgs),

    /// List parts
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Model / part number
    #[arg(long, short = 'm')]
    pub model: String,

    /// Manufacturer ID
    #[arg(long)]
    pub manufacturer: String,

    /// Owning module ID (requires --type)
    #[arg(long, requires = "module_type")]
    pub module: Option<String>,

    /// Module type tag (e.g. ECM, APA)
    #[arg(long = "type", short = 't')]
    pub module_type: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub specification: Option<String>,

    /// Criticality (non_critical, critical, mission_critical)
    #[arg(long, default_value = "non_critical")]
    pub criticality: Criticality,

    /// Units in stock
    #[arg(long, default_value_t = 0)]
    pub stock: i64,

    /// Reorder when stock falls to this level
    #[arg(long)]
    pub threshold: Option<i64>,

    #[arg(long)]
    pub unit_cost: Option<f64>,

    #[arg(long)]
    pub lead_time_days: Option<u32>,

    /// Type-specific attribute KEY=VALUE (VALUE parsed as JSON when possible)
    #[arg(long = "attr", value_parser = parse_attribute)]
    pub attributes: Vec<(String, Value)>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include retired parts
    #[arg(long)]
    pub all: bool,
}

fn parse_attribute(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("attribute key is empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub fn run(cmd: PartCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PartCommands::New(args) => run_new(args, global),
        PartCommands::List(args) => run_list(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let manufacturer = parse_id(&args.manufacturer, EntityKind::Manufacturer)?;
    let module = args
        .module
        .as_deref()
        .map(|raw| parse_id(raw, EntityKind::Module))
        .transpose()?;
    let (store, _) = open_store(global)?;

    let mut part = Part::new(args.model, manufacturer).with_criticality(args.criticality);
    part.module = module;
    part.module_type = args.module_type;
    part.category = args.category;
    part.specification = args.specification;
    part.stock_level = args.stock;
    part.reorder_threshold = args.threshold;
    part.unit_cost = args.unit_cost;
    part.lead_time_days = args.lead_time_days;
    for (key, value) in args.attributes {
        part = part.with_attribute(key, value);
    }

    let id = store.create(part)?;
    print_created(global, &id, "part")
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let mut query = PartQuery::new();
    if args.all {
        query = query.include_retired();
    }
    let rows: Vec<_> = Facade::new(store.snapshot()).parts(query).collect();

    match global.format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new([
                "ID",
                "MODEL",
                "TYPE",
                "MANUFACTURER",
                "STOCK",
                "THRESHOLD",
                "CRITICALITY",
            ]);
            for row in &rows {
                let p = &row.part;
                table.push([
                    p.id.to_string(),
                    truncate_str(&p.model, 24),
                    or_dash(p.module_type.as_deref()),
                    or_dash(row.manufacturer_name.as_deref().map(|n| truncate_str(n, 24))),
                    p.stock_level.to_string(),
                    or_dash(p.reorder_threshold),
                    p.criticality.to_string(),
                ]);
            }
            table.print("part", "No parts found.", global.quiet);
            Ok(())
        }
    }
}
