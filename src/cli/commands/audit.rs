//! `vpm audit` command - Change log

use miette::Result;
use serde_json::Value;

use crate::cli::helpers::{open_store, parse_any_id, print_json, truncate_str};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct AuditArgs {
    /// Only changes to this entity
    pub id: Option<String>,

    /// Show only the most recent N changes
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => truncate_str(s, 30),
        other => truncate_str(&other.to_string(), 30),
    }
}

pub fn run(args: AuditArgs, global: &GlobalOpts) -> Result<()> {
    let entity = args.id.as_deref().map(parse_any_id).transpose()?;
    let (store, _) = open_store(global)?;
    let mut trail = store.audit_trail(entity.as_ref())?;
    if let Some(limit) = args.limit {
        let skip = trail.len().saturating_sub(limit);
        trail.drain(..skip);
    }

    match global.format {
        OutputFormat::Json => print_json(&trail),
        OutputFormat::Table => {
            let mut table = Table::new(["WHEN", "ENTITY", "FIELD", "OLD", "NEW"]);
            for change in &trail {
                table.push([
                    change.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    change.entity.to_string(),
                    change.field.clone(),
                    cell(&change.old_value),
                    cell(&change.new_value),
                ]);
            }
            table.print("change", "No changes recorded.", global.quiet);
            Ok(())
        }
    }
}
