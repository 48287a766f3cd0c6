//! Project discovery and layout

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-project state directory
pub const PROJECT_DIR: &str = ".vpm";

/// Default catalog database file inside the project directory
pub const DATABASE_FILE: &str = "catalog.db";

/// A VPM project: a directory containing `.vpm/`
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .vpm/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create `.vpm/` with a default config at the given path
    ///
    /// The catalog database itself is created on first open.
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let vpm_dir = root.join(PROJECT_DIR);
        if vpm_dir.exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        std::fs::create_dir_all(&vpm_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(vpm_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# VPM project configuration

# Catalog database, relative to this project's root
# database: .vpm/catalog.db

# How long a mutation waits for a busy entity before giving up
# lock_timeout_ms: 2000

# Manufacturers whose financials are older than this are reported as stale
# stale_review_days: 365

# tracing filter directive (overridden by VPM_LOG)
# log_filter: vpm=warn
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .vpm state directory
    pub fn vpm_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.vpm_dir().join("config.yaml")
    }

    /// Default location of the catalog database
    pub fn default_database(&self) -> PathBuf {
        self.vpm_dir().join(DATABASE_FILE)
    }

    /// Resolve a configured database path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a VPM project (searched from {searched_from:?}). Run 'vpm init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("VPM project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.vpm_dir().is_dir());
        assert!(project.config_path().exists());
        assert_eq!(project.default_database(), project.vpm_dir().join("catalog.db"));
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_discover_walks_up() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("fleet/m1078/ecm");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_vpm_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_resolve_relative_database() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        assert_eq!(
            project.resolve(Path::new("data/fleet.db")),
            project.root().join("data/fleet.db")
        );
        let abs = tmp.path().join("elsewhere.db");
        assert_eq!(project.resolve(&abs), abs);
    }
}
