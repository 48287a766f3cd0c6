use clap::Parser;
use miette::Result;
use vpm::cli::commands::{
    alerts, audit, cert, contract, import, init, lifecycle, mfr, module, part, query, show, stock,
    xref,
};
use vpm::cli::{helpers, logging, Cli, Commands};
use vpm::core::Config;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let project = helpers::find_project(&global).ok();
    let config = Config::load(project.as_ref());
    logging::init(&global, &config);

    match cli.command {
        Commands::Init(args) => init::run(args, &global),
        Commands::Mfr(cmd) => mfr::run(cmd, &global),
        Commands::Module(cmd) => module::run(cmd, &global),
        Commands::Part(cmd) => part::run(cmd, &global),
        Commands::Cert(cmd) => cert::run(cmd, &global),
        Commands::Contract(cmd) => contract::run(cmd, &global),
        Commands::Xref(cmd) => xref::run(cmd, &global),
        Commands::Show(args) => show::run(args, &global),
        Commands::Set(args) => stock::run_set(args, &global),
        Commands::Stock(args) => stock::run_stock(args, &global),
        Commands::Retire(args) => lifecycle::run_retire(args, &global),
        Commands::Purge(args) => lifecycle::run_purge(args, &global),
        Commands::Dependents(args) => lifecycle::run_dependents(args, &global),
        Commands::Alerts(args) => alerts::run(args, &global),
        Commands::Query(cmd) => query::run(cmd, &global),
        Commands::Audit(args) => audit::run(args, &global),
        Commands::Import(cmd) => import::run(cmd, &global),
    }
}
