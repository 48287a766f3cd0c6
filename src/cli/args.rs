//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    alerts::AlertsArgs,
    audit::AuditArgs,
    cert::CertCommands,
    contract::ContractCommands,
    import::ImportCommands,
    init::InitArgs,
    lifecycle::{DependentsArgs, PurgeArgs, RetireArgs},
    mfr::MfrCommands,
    module::ModuleCommands,
    part::PartCommands,
    query::QueryCommands,
    show::ShowArgs,
    stock::{SetArgs, StockArgs},
    xref::XrefCommands,
};

#[derive(Parser)]
#[command(name = "vpm")]
#[command(author, version, about = "Vehicle Parts MDM")]
#[command(
    long_about = "Catalog of vehicle parts, modules and manufacturers with referential integrity, stock and procurement lifecycle alerts."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .vpm/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new VPM project
    Init(InitArgs),

    /// Manufacturer management
    #[command(subcommand)]
    Mfr(MfrCommands),

    /// Vehicle module management
    #[command(subcommand)]
    Module(ModuleCommands),

    /// Part management
    #[command(subcommand)]
    Part(PartCommands),

    /// Quality certification management
    #[command(subcommand)]
    Cert(CertCommands),

    /// Procurement contract management
    #[command(subcommand)]
    Contract(ContractCommands),

    /// Manufacturer cross-reference management
    #[command(subcommand)]
    Xref(XrefCommands),

    /// Show any entity by ID
    Show(ShowArgs),

    /// Change fields of an entity
    Set(SetArgs),

    /// Record a stock movement on a part or module
    Stock(StockArgs),

    /// Retire an entity (kept for history, no longer usable)
    Retire(RetireArgs),

    /// Permanently delete an entity nothing references
    Purge(PurgeArgs),

    /// List live entities that depend on an entity
    Dependents(DependentsArgs),

    /// Evaluate reorder, certification, contract and supply-risk alerts
    Alerts(AlertsArgs),

    /// Catalog reports
    #[command(subcommand)]
    Query(QueryCommands),

    /// Show the change log
    Audit(AuditArgs),

    /// Bulk import from CSV
    #[command(subcommand)]
    Import(ImportCommands),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Markdown-style tables for humans
    #[default]
    Table,
    /// JSON format (for programming)
    Json,
}
