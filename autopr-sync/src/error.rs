//! Error types for autopr-sync.

use std::path::PathBuf;

use thiserror::Error;

use autopr_core::StateError;
use autopr_forge::ForgeError;

/// A git invocation that could not be started or exited non-zero.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Output is stdout and stderr combined.
    #[error("`{command}` failed (code: {status}):\n{output}", status = display_code(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

/// Errors raised while syncing or publishing one repository, or while
/// checkpointing the state between repositories.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("forge error: {0}")]
    Forge(#[from] ForgeError),

    /// Checkpoint write failed; the batch cannot continue safely.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The update command exited non-zero.
    #[error("update command `{command}` failed (code: {status}):\n{output}", status = display_code(.code))]
    UpdateCommand {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("no update command configured")]
    EmptyUpdateCommand,

    /// Cancellation was requested while the working copy was being synced.
    #[error("cancelled")]
    Cancelled,

    /// Working copy expected by a pipeline step does not exist.
    #[error("working copy {path} is missing; run `auto-pr pull` first")]
    MissingWorkingCopy { path: PathBuf },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
