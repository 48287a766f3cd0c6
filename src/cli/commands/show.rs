//! `vpm show` command - Display any entity

use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use crate::cli::helpers::{open_store, parse_any_id, print_json};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Entity ID (MFR-, MOD-, PART-, CERT-, CTR- or XREF-...)
    pub id: String,
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let id = parse_any_id(&args.id)?;
    let (store, _) = open_store(global)?;
    let stored = store.get(&id)?;

    match global.format {
        OutputFormat::Json => print_json(&stored),
        OutputFormat::Table => {
            let payload = stored.record.payload().into_diagnostic()?;
            let mut table = Table::new(["FIELD", "VALUE"]);
            table.push(["kind".to_string(), stored.kind().label().to_string()]);
            if let Value::Object(fields) = payload {
                for (field, value) in &fields {
                    table.push([field.clone(), render(value)]);
                }
            }
            table.push(["version".to_string(), stored.version.to_string()]);
            table.push([
                "state".to_string(),
                match stored.retired_at {
                    Some(at) => format!("retired {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                    None => "live".to_string(),
                },
            ]);
            println!("{}", table.render());
            Ok(())
        }
    }
}
