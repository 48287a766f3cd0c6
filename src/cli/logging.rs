//! tracing subscriber setup for the binary

use tracing_subscriber::EnvFilter;

use crate::cli::GlobalOpts;
use crate::core::config::Config;

/// Filter directive for this run: `--verbose` wins, then config/`VPM_LOG`
pub fn filter_directive(global: &GlobalOpts, config: &Config) -> String {
    if global.verbose {
        "vpm=debug".to_string()
    } else {
        config.log_filter().to_string()
    }
}

/// Install the stderr subscriber and report deferred config warnings
pub fn init(global: &GlobalOpts, config: &Config) {
    let directive = filter_directive(global, config);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| {
        EnvFilter::new(crate::core::config::DEFAULT_LOG_FILTER)
    });

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        for warning in &config.warnings {
            tracing::warn!("{}", warning);
        }
    }
}
