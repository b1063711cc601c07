//! Work directory layout.
//!
//! ```text
//! <workdir>/
//!   config.yaml   (mode 0600, holds the API key)
//!   db.json       (persisted state, mode 0600)
//!   repos/        (working copies: repos/<owner>/<name>; overridable)
//! ```

use std::path::{Path, PathBuf};

use crate::error::{config_io, ConfigError, InitError, StateError};
use crate::types::{Config, Credentials, PersistedState, RepositoryId};
use crate::{config, state};

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DB_FILE_NAME: &str = "db.json";
pub const REPOS_DIR_NAME: &str = "repos";

/// Location of one auto-pr work directory plus an optional repositories
/// directory given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    pub location: PathBuf,
    pub repos_dir_override: Option<PathBuf>,
}

impl WorkDir {
    pub fn new(location: impl Into<PathBuf>, repos_dir_override: Option<PathBuf>) -> Self {
        Self {
            location: location.into(),
            repos_dir_override,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.location.join(CONFIG_FILE_NAME)
    }

    pub fn database_file(&self) -> PathBuf {
        self.location.join(DB_FILE_NAME)
    }

    /// Command line, then config `custom_repos_dir`, then `<workdir>/repos`.
    pub fn repos_dir(&self, config: Option<&Config>) -> PathBuf {
        self.custom_repos_dir(config)
            .unwrap_or_else(|| self.location.join(REPOS_DIR_NAME))
    }

    fn custom_repos_dir(&self, config: Option<&Config>) -> Option<PathBuf> {
        self.repos_dir_override
            .clone()
            .or_else(|| config.and_then(|c| c.custom_repos_dir.clone()))
    }

    pub fn load_config(&self) -> Result<Config, ConfigError> {
        config::load_at(&self.config_file())
    }

    pub fn load_state(&self) -> Result<PersistedState, StateError> {
        state::load_at(&self.database_file())
    }

    pub fn save_state(&self, state: &PersistedState) -> Result<(), StateError> {
        state::save_at(&self.database_file(), state)
    }
}

/// `<repos_dir>/<owner>/<name>`
pub fn working_copy(repos_dir: &Path, id: &RepositoryId) -> PathBuf {
    repos_dir.join(&id.owner).join(&id.name)
}

/// What [`init`] did. Files that already existed are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub repos_dir: PathBuf,
    pub config_written: bool,
    pub database_written: bool,
}

impl InitReport {
    /// One line per file that was kept rather than written.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if !self.config_written {
            warnings.push("config file exists - not overriding");
        }
        if !self.database_written {
            warnings.push("database file exists - not overriding");
        }
        warnings
    }
}

/// Prepare `workdir`: repositories directory, default config, empty state.
///
/// A custom repositories directory must already exist; the default one is
/// created.
pub fn init(workdir: &WorkDir, credentials: Credentials) -> Result<InitReport, InitError> {
    std::fs::create_dir_all(&workdir.location).map_err(|e| config_io(&workdir.location, e))?;

    let repos_dir = match workdir.custom_repos_dir(None) {
        Some(custom) => {
            if !custom.is_dir() {
                return Err(ConfigError::ReposDirMissing { path: custom }.into());
            }
            custom
        }
        None => {
            let dir = workdir.repos_dir(None);
            std::fs::create_dir_all(&dir).map_err(|e| config_io(&dir, e))?;
            dir
        }
    };

    let config_path = workdir.config_file();
    let config_written = !config_path.exists();
    if config_written {
        let mut config = Config::new(credentials);
        config.custom_repos_dir = workdir.repos_dir_override.clone();
        config::save_at(&config_path, &config)?;
        tracing::debug!(path = %config_path.display(), "wrote default config");
    }

    let db_path = workdir.database_file();
    let database_written = !db_path.exists();
    if database_written {
        state::save_at(&db_path, &PersistedState::default())?;
        tracing::debug!(path = %db_path.display(), "wrote empty state");
    }

    Ok(InitReport {
        repos_dir,
        config_written,
        database_written,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
