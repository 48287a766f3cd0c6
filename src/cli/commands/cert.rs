//! `vpm cert` command - Quality certification management

use clap::Subcommand;
use miette::Result;

use crate::cli::helpers::{open_store, parse_date, parse_id, print_created, print_json};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityKind;
use crate::entities::QualityCertification;

#[derive(Subcommand, Debug)]
pub enum CertCommands {
    /// Record a certification held by a part
    New(NewArgs),

    /// List certifications, optionally for one part
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Certified part ID
    #[arg(long)]
    pub part: String,

    /// Certification level (e.g. MIL-STD-810H)
    #[arg(long, short = 'l')]
    pub level: String,

    /// Last day the certification is valid (YYYY-MM-DD)
    #[arg(long)]
    pub valid_until: String,

    /// Issuing authority
    #[arg(long)]
    pub authority: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only certifications of this part
    #[arg(long)]
    pub part: Option<String>,
}

pub fn run(cmd: CertCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CertCommands::New(args) => run_new(args, global),
        CertCommands::List(args) => run_list(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let part = parse_id(&args.part, EntityKind::Part)?;
    let valid_until = parse_date(&args.valid_until)?;
    let (store, _) = open_store(global)?;

    let id = store.create(QualityCertification::new(
        part,
        args.level,
        valid_until,
        args.authority,
    ))?;
    print_created(global, &id, "certification")
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let part = args
        .part
        .as_deref()
        .map(|raw| parse_id(raw, EntityKind::Part))
        .transpose()?;
    let (store, _) = open_store(global)?;
    let today = store.today();
    let snapshot = store.snapshot();

    let certs: Vec<&QualityCertification> = snapshot
        .live::<QualityCertification>()
        .filter(|c| part.as_ref().map_or(true, |p| &c.part == p))
        .collect();

    match global.format {
        OutputFormat::Json => print_json(&certs),
        OutputFormat::Table => {
            let mut table = Table::new(["ID", "PART", "LEVEL", "VALID UNTIL", "AUTHORITY", "STATE"]);
            for c in &certs {
                table.push([
                    c.id.to_string(),
                    c.part.to_string(),
                    c.level.clone(),
                    c.valid_until.to_string(),
                    c.issuing_authority.clone(),
                    if c.is_expired(today) { "expired" } else { "valid" }.to_string(),
                ]);
            }
            table.print("certification", "No certifications found.", global.quiet);
            Ok(())
        }
    }
}
