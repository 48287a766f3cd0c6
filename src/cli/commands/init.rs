//! `vpm init` command - Initialize a new VPM project

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::persistence::SqlitePersistence;
use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
    }

    match Project::init(&path) {
        Ok(project) => {
            let config = Config::load(Some(&project));
            let database = config.database(&project);
            SqlitePersistence::open(&database)
                .map_err(|e| miette::miette!("cannot create catalog {}: {}", database.display(), e))?;

            if global.quiet {
                return Ok(());
            }
            println!(
                "{} Initialized VPM project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!("  catalog: {}", style(database.display()).dim());
            println!();
            println!("Next steps:");
            println!(
                "  {} Register a manufacturer",
                style("vpm mfr new --name <NAME> --rating B").yellow()
            );
            println!(
                "  {} Check reorder and lifecycle alerts",
                style("vpm alerts").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} VPM project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}
