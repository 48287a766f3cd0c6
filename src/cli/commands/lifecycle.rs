//! `vpm retire`, `vpm purge` and `vpm dependents` commands

use console::style;
use miette::Result;

use crate::cli::helpers::{notice, open_store, parse_any_id, print_json, success};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::RetireOutcome;

#[derive(clap::Args, Debug)]
pub struct RetireArgs {
    /// Entity ID
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct PurgeArgs {
    /// Entity ID
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct DependentsArgs {
    /// Entity ID
    pub id: String,
}

pub fn run_retire(args: RetireArgs, global: &GlobalOpts) -> Result<()> {
    let id = parse_any_id(&args.id)?;
    let (store, _) = open_store(global)?;
    let outcome = store.retire(&id)?;

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "id": id,
            "retired": outcome == RetireOutcome::Retired,
        })),
        OutputFormat::Table => {
            match outcome {
                RetireOutcome::Retired => success(global, format!("Retired {}", style(&id).cyan())),
                RetireOutcome::Unchanged => notice(global, format!("{} was already retired", id)),
            }
            Ok(())
        }
    }
}

pub fn run_purge(args: PurgeArgs, global: &GlobalOpts) -> Result<()> {
    let id = parse_any_id(&args.id)?;
    let (store, _) = open_store(global)?;
    store.purge(&id)?;

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "purged": true })),
        OutputFormat::Table => {
            success(global, format!("Purged {}", style(&id).cyan()));
            Ok(())
        }
    }
}

pub fn run_dependents(args: DependentsArgs, global: &GlobalOpts) -> Result<()> {
    let id = parse_any_id(&args.id)?;
    let (store, _) = open_store(global)?;
    let dependents = store.find_dependents(&id)?;
    let snapshot = store.snapshot();

    match global.format {
        OutputFormat::Json => print_json(&dependents),
        OutputFormat::Table => {
            let mut table = Table::new(["ID", "KIND", "TITLE"]);
            for dep in &dependents {
                let title = snapshot
                    .get(dep)
                    .map(|s| s.record.title().to_string())
                    .unwrap_or_default();
                table.push([dep.to_string(), dep.kind().label().to_string(), title]);
            }
            table.print(
                "dependent",
                &format!("Nothing live depends on {}.", id),
                global.quiet,
            );
            Ok(())
        }
    }
}
