//! Error types for autopr-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RepositoryId;

/// Errors raised while loading, validating, or writing configuration.
///
/// All of these are fatal: they surface before any repository work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure, with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file does not exist.
    #[error("config not found at {path}; run `auto-pr init` first")]
    NotFound { path: PathBuf },

    /// YAML parse or schema error on load, including the file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A `${NAME}` placeholder references a variable that is not set.
    #[error("environment variable '{name}' referenced in config is not set")]
    MissingEnvVar { name: String },

    /// A filter pattern is not a valid regular expression.
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A custom repositories directory was configured but is missing.
    #[error("custom repositories directory {path} does not exist")]
    ReposDirMissing { path: PathBuf },
}

/// Errors raised by the persisted state store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load, including the file path.
    #[error("failed to parse state at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (write path).
    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two records share the same `owner/name`.
    #[error("repository {id} appears more than once in the state")]
    DuplicateRepository { id: RepositoryId },
}

/// Errors from `workdir::init`, which touches both config and state.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),
}

pub(crate) fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn state_io(path: impl Into<PathBuf>, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.into(),
        source,
    }
}
