//! Shared helper functions for CLI commands
//!
//! Project discovery, opening the catalog, argument parsing and the status
//! lines every command prints.

use chrono::NaiveDate;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::clock::SystemClock;
use crate::core::config::Config;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::persistence::SqlitePersistence;
use crate::core::project::Project;
use crate::core::store::{CatalogStore, StoreOptions};

/// The catalog as the CLI uses it
pub type Store = CatalogStore<SqlitePersistence, SystemClock>;

/// Locate the project from `--project` or the current directory
pub fn find_project(global: &GlobalOpts) -> Result<Project> {
    let found = match global.project {
        Some(ref root) => Project::discover_from(root),
        None => Project::discover(),
    };
    found.map_err(|e| miette::miette!("{}", e))
}

/// Open the project's catalog store with its layered configuration
pub fn open_store(global: &GlobalOpts) -> Result<(Store, Config)> {
    let project = find_project(global)?;
    let config = Config::load(Some(&project));
    let path = config.database(&project);
    tracing::debug!(database = %path.display(), "opening catalog");

    let persistence = SqlitePersistence::open(&path)
        .map_err(|e| miette::miette!("cannot open catalog {}: {}", path.display(), e))?;
    let store = CatalogStore::open(
        persistence,
        SystemClock,
        StoreOptions {
            lock_timeout: config.lock_timeout(),
        },
    )?;
    Ok((store, config))
}

/// Parse an entity ID, requiring a particular kind
pub fn parse_id(raw: &str, kind: EntityKind) -> Result<EntityId> {
    let id = parse_any_id(raw)?;
    if id.kind() != kind {
        return Err(miette::miette!(
            "{} is a {}, expected a {} ID ({}-...)",
            id,
            id.kind().label(),
            kind.label(),
            kind.prefix()
        ));
    }
    Ok(id)
}

/// Parse an entity ID of any kind
pub fn parse_any_id(raw: &str) -> Result<EntityId> {
    EntityId::parse(raw.trim()).map_err(|e| miette::miette!("{}", e))
}

/// Parse a YYYY-MM-DD date
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| miette::miette!("invalid date '{}' (expected YYYY-MM-DD): {}", raw, e))
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{}", json);
    Ok(())
}

/// Report a successful mutation: the ID in JSON mode, a status line otherwise
pub fn print_created(global: &GlobalOpts, id: &EntityId, what: &str) -> Result<()> {
    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "id": id })),
        OutputFormat::Table => {
            if global.quiet {
                println!("{}", id);
            } else {
                println!(
                    "{} Created {} {}",
                    style("✓").green(),
                    what,
                    style(id).cyan()
                );
            }
            Ok(())
        }
    }
}

/// Print a green status line unless `--quiet`
pub fn success(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{} {}", style("✓").green(), message);
    }
}

/// Print a yellow notice unless `--quiet`
pub fn notice(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{} {}", style("!").yellow(), message);
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render an optional value, `-` when absent
pub fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_parse_id_checks_kind() {
        let id = EntityId::new(EntityKind::Part);
        assert_eq!(parse_id(&id.to_string(), EntityKind::Part).unwrap(), id);
        assert!(parse_id(&id.to_string(), EntityKind::Module).is_err());
        assert!(parse_any_id("PART-nope").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert!(parse_date("03/01/2026").is_err());
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(Some(3)), "3");
        assert_eq!(or_dash(None::<i64>), "-");
    }
}
