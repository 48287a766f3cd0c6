//! `vpm import` command - Bulk import from CSV

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::cli::helpers::{open_store, print_json};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::import::{import_contracts, ImportOptions, ImportSummary, CONTRACT_COLUMNS};

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Import procurement contracts, one per CSV row
    Contracts(ContractsArgs),
}

#[derive(clap::Args, Debug)]
pub struct ContractsArgs {
    /// CSV file to import
    #[arg(required_unless_present = "template")]
    pub file: Option<PathBuf>,

    /// Print the CSV header row and exit
    #[arg(long)]
    pub template: bool,

    /// Stop at the first failing row (earlier rows stay committed)
    #[arg(long)]
    pub stop_on_error: bool,
}

pub fn run(cmd: ImportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ImportCommands::Contracts(args) => run_contracts(args, global),
    }
}

fn run_contracts(args: ContractsArgs, global: &GlobalOpts) -> Result<()> {
    if args.template {
        println!("{}", CONTRACT_COLUMNS.join(","));
        return Ok(());
    }
    let Some(path) = args.file else {
        return Err(miette::miette!("CSV file required. Usage: vpm import contracts data.csv"));
    };
    if !path.exists() {
        return Err(miette::miette!("File not found: {}", path.display()));
    }

    let (store, _) = open_store(global)?;
    let file = File::open(&path).into_diagnostic()?;
    let report = import_contracts(
        &store,
        BufReader::new(file),
        ImportOptions {
            stop_on_error: args.stop_on_error,
        },
    )?;

    match global.format {
        OutputFormat::Json => print_json(&ImportSummary::from(&report))?,
        OutputFormat::Table => {
            for failure in &report.failures {
                eprintln!(
                    "{} Row {}: {}",
                    style("✗").red(),
                    failure.row,
                    failure.error
                );
            }
            if !global.quiet {
                for id in &report.created {
                    println!("{} Created contract {}", style("✓").green(), style(id).cyan());
                }
                println!();
                println!(
                    "{} row(s) processed, {} created, {} failed{}",
                    report.rows_processed,
                    style(report.created.len()).green(),
                    style(report.failures.len()).red(),
                    if report.stopped { " (stopped at first error)" } else { "" }
                );
            }
        }
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(miette::miette!(
            "{} of {} row(s) failed to import",
            report.failures.len(),
            report.rows_processed
        ))
    }
}
