//! `vpm module` command - Vehicle module management

use clap::Subcommand;
use miette::Result;

use crate::cli::helpers::{open_store, or_dash, parse_id, print_created, print_json, truncate_str};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::{Criticality, OperationalStatus};
use crate::core::identity::EntityKind;
use crate::entities::Module;

#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    /// Create a new module
    New(NewArgs),

    /// List modules
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Module type tag (e.g. ECM, APA)
    #[arg(long = "type", short = 't')]
    pub module_type: String,

    /// Model designation
    #[arg(long, short = 'm')]
    pub model: String,

    /// Manufacturer ID
    #[arg(long)]
    pub manufacturer: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Vehicle or environment the module is installed in
    #[arg(long)]
    pub environment: Option<String>,

    /// Operational status (active, inactive, under_review)
    #[arg(long, default_value = "active")]
    pub status: OperationalStatus,

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
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include retired modules
    #[arg(long)]
    pub all: bool,
}

pub fn run(cmd: ModuleCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ModuleCommands::New(args) => run_new(args, global),
        ModuleCommands::List(args) => run_list(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let manufacturer = parse_id(&args.manufacturer, EntityKind::Manufacturer)?;
    let (store, _) = open_store(global)?;

    let mut module = Module::new(args.module_type, args.model, manufacturer);
    module.description = args.description;
    module.installation_environment = args.environment;
    module.status = args.status;
    module.criticality = args.criticality;
    module.stock_count = args.stock;
    module.reorder_threshold = args.threshold;
    module.unit_cost = args.unit_cost;
    module.lead_time_days = args.lead_time_days;

    let id = store.create(module)?;
    print_created(global, &id, "module")
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let snapshot = store.snapshot();
    let modules: Vec<&Module> = snapshot
        .iter_kind(EntityKind::Module)
        .filter(|s| args.all || s.is_live())
        .filter_map(|s| s.as_entity::<Module>())
        .collect();

    match global.format {
        OutputFormat::Json => print_json(&modules),
        OutputFormat::Table => {
            let mut table = Table::new([
                "ID", "TYPE", "MODEL", "ENVIRONMENT", "STATUS", "STOCK", "THRESHOLD",
            ]);
            for m in &modules {
                table.push([
                    m.id.to_string(),
                    m.module_type.clone(),
                    truncate_str(&m.model, 24),
                    or_dash(m.installation_environment.as_deref()),
                    m.status.to_string(),
                    m.stock_count.to_string(),
                    or_dash(m.reorder_threshold),
                ]);
            }
            table.print("module", "No modules found.", global.quiet);
            Ok(())
        }
    }
}
