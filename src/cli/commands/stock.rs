//! `vpm set` and `vpm stock` commands - field updates and stock movements

use miette::Result;
use serde_json::Value;

use crate::cli::helpers::{open_store, parse_any_id, parse_date, print_json, success};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::record::Patch;

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Entity ID
    pub id: String,

    /// FIELD=VALUE assignments (VALUE parsed as JSON when possible, `null` clears)
    #[arg(required = true, value_parser = parse_assignment)]
    pub assignments: Vec<(String, Value)>,

    /// Fail with a busy error unless the entity is at this version
    #[arg(long)]
    pub expect_version: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct StockArgs {
    /// Part or module ID
    pub id: String,

    /// Units received (positive) or issued (negative)
    #[arg(allow_negative_numbers = true)]
    pub delta: i64,

    /// Receipt date stamped as last_received (YYYY-MM-DD)
    #[arg(long)]
    pub received_on: Option<String>,
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", raw))?;
    let field = field.trim();
    if field.is_empty() {
        return Err("field name is empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

pub fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let id = parse_any_id(&args.id)?;
    let patch = args
        .assignments
        .into_iter()
        .fold(Patch::new(), |patch, (field, value)| patch.set_value(&field, value));

    let (store, _) = open_store(global)?;
    let version = match args.expect_version {
        Some(expected) => store.update_versioned(&id, expected, &patch)?,
        None => store.update(&id, &patch)?,
    };

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "version": version })),
        OutputFormat::Table => {
            success(global, format!("Updated {} (version {})", id, version));
            Ok(())
        }
    }
}

pub fn run_stock(args: StockArgs, global: &GlobalOpts) -> Result<()> {
    let id = parse_any_id(&args.id)?;
    let received_on = args.received_on.as_deref().map(parse_date).transpose()?;

    let (store, _) = open_store(global)?;
    let level = store.adjust_stock(&id, args.delta, received_on)?;

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "stock": level })),
        OutputFormat::Table => {
            success(global, format!("{} stock is now {}", id, level));
            Ok(())
        }
    }
}
