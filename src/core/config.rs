//! Configuration management with layered hierarchy
//!
//! Built-in defaults, then the global user config, then the project's
//! `.vpm/config.yaml`, then `VPM_*` environment variables. Later layers win.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::project::Project;
use crate::core::store::DEFAULT_LOCK_TIMEOUT;

pub const DEFAULT_STALE_REVIEW_DAYS: i64 = 365;
pub const DEFAULT_LOG_FILTER: &str = "vpm=warn";

/// VPM configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog database path; relative paths resolve against the project root
    pub database: Option<PathBuf>,

    /// Bounded wait for entity locks, in milliseconds
    pub lock_timeout_ms: Option<u64>,

    /// Age after which a manufacturer's financial review is stale
    pub stale_review_days: Option<i64>,

    /// tracing `EnvFilter` directive
    pub log_filter: Option<String>,

    /// Problems met while loading; reported once logging is up
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        Self::load_from(
            Self::global_config_path().as_deref(),
            project.map(Project::config_path).as_deref(),
            |key| std::env::var(key).ok(),
        )
    }

    /// Load with explicit sources
    pub fn load_from(
        global: Option<&Path>,
        project: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = Config::default();

        for path in [global, project].into_iter().flatten() {
            if let Some(layer) = Self::read_layer(path, &mut config.warnings) {
                config.merge(layer);
            }
        }

        if let Some(database) = env("VPM_DATABASE") {
            config.database = Some(PathBuf::from(database));
        }
        if let Some(raw) = env("VPM_LOCK_TIMEOUT_MS") {
            match raw.trim().parse() {
                Ok(ms) => config.lock_timeout_ms = Some(ms),
                Err(_) => config
                    .warnings
                    .push(format!("ignoring VPM_LOCK_TIMEOUT_MS={}: not a number", raw)),
            }
        }
        if let Some(raw) = env("VPM_STALE_REVIEW_DAYS") {
            match raw.trim().parse() {
                Ok(days) => config.stale_review_days = Some(days),
                Err(_) => config
                    .warnings
                    .push(format!("ignoring VPM_STALE_REVIEW_DAYS={}: not a number", raw)),
            }
        }
        if let Some(filter) = env("VPM_LOG") {
            config.log_filter = Some(filter);
        }

        config
    }

    fn read_layer(path: &Path, warnings: &mut Vec<String>) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warnings.push(format!("cannot read {}: {}", path.display(), e));
                return None;
            }
        };
        // A config of only comments parses as null
        if contents.lines().all(|l| {
            let l = l.trim();
            l.is_empty() || l.starts_with('#')
        }) {
            return None;
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(layer) => Some(layer),
            Err(e) => {
                warnings.push(format!("ignoring {}: {}", path.display(), e));
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vpm")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.lock_timeout_ms.is_some() {
            self.lock_timeout_ms = other.lock_timeout_ms;
        }
        if other.stale_review_days.is_some() {
            self.stale_review_days = other.stale_review_days;
        }
        if other.log_filter.is_some() {
            self.log_filter = other.log_filter;
        }
    }

    /// Catalog database location for a project
    pub fn database(&self, project: &Project) -> PathBuf {
        match self.database {
            Some(ref path) => project.resolve(path),
            None => project.default_database(),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn stale_review_days(&self) -> i64 {
        self.stale_review_days.unwrap_or(DEFAULT_STALE_REVIEW_DAYS)
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
