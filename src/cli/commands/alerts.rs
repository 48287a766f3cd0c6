//! `vpm alerts` command - Reorder and lifecycle monitor

use clap::ValueEnum;
use console::style;
use miette::Result;

use crate::cli::helpers::{open_store, parse_date, print_json};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::clock::Clock;
use crate::core::monitor::{self, Alert};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlertKind {
    Reorder,
    Certification,
    Contract,
    SupplyRisk,
}

impl AlertKind {
    fn matches(&self, alert: &Alert) -> bool {
        matches!(
            (self, alert),
            (AlertKind::Reorder, Alert::ReorderNeeded { .. })
                | (AlertKind::Certification, Alert::CertificationExpired { .. })
                | (AlertKind::Contract, Alert::ContractExpiringUnrenewed { .. })
                | (AlertKind::SupplyRisk, Alert::SupplyRiskCritical { .. })
        )
    }
}

#[derive(clap::Args, Debug)]
pub struct AlertsArgs {
    /// Only alerts of these kinds
    #[arg(long, value_delimiter = ',')]
    pub kind: Vec<AlertKind>,

    /// Evaluate as of this date instead of today (YYYY-MM-DD)
    #[arg(long)]
    pub as_of: Option<String>,

    /// Only alerts about entities changed on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub changed_since: Option<String>,
}

pub fn run(args: AlertsArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let now = match args.as_of {
        Some(ref raw) => parse_date(raw)?.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
        None => store.clock().now(),
    };
    let snapshot = store.snapshot();

    let alerts = match args.changed_since {
        Some(ref raw) => {
            let since = parse_date(raw)?;
            let changes: Vec<_> = store
                .audit_trail(None)?
                .into_iter()
                .filter(|c| c.recorded_at.date_naive() >= since)
                .collect();
            monitor::evaluate_changes(&snapshot, &changes, now)
        }
        None => monitor::evaluate(&snapshot, now),
    };
    let alerts: Vec<Alert> = alerts
        .into_iter()
        .filter(|a| args.kind.is_empty() || args.kind.iter().any(|k| k.matches(a)))
        .collect();

    match global.format {
        OutputFormat::Json => print_json(&alerts),
        OutputFormat::Table => {
            if alerts.is_empty() {
                if !global.quiet {
                    println!("{} No alerts.", style("✓").green());
                }
                return Ok(());
            }

            let mut table = Table::new(["ALERT", "SUBJECT", "DETAIL"]);
            for alert in &alerts {
                table.push([
                    alert.label().to_string(),
                    alert.subject().to_string(),
                    alert.to_string(),
                ]);
            }
            table.print("alert", "No alerts.", global.quiet);
            Ok(())
        }
    }
}
