//! Local working copies: clone when absent, update on request, and heal a
//! broken clone by deleting it and cloning again.
//!
//! ```text
//! ABSENT                     → clone                         → Cloned
//! PRESENT, no update         → (nothing)                     → Unchanged
//! PRESENT, update            → checkout default, pull        → Updated
//!        └ checkout/pull fails → delete working copy, clone → Recloned
//! ```
//!
//! Every step is written to a per-repository [`SyncLog`] instead of the
//! console; the caller prints the log as one block.

use std::path::{Path, PathBuf};

use autopr_core::{working_copy, Account, RepositoryId, RepositoryRecord};

use crate::cancel::Cancellation;
use crate::error::{io_err, SyncError};
use crate::git::Git;

/// Everything a worker needs to sync one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub id: RepositoryId,
    pub ssh_url: String,
    pub default_branch: String,
    pub working_copy: PathBuf,
}

impl SyncRequest {
    pub fn new(record: &RepositoryRecord, repos_dir: &Path) -> Self {
        let id = record.id();
        Self {
            working_copy: working_copy(repos_dir, &id),
            id,
            ssh_url: record.ssh_url.clone(),
            default_branch: record.default_branch.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Cloned,
    Updated,
    /// Update failed; the working copy was deleted and cloned again.
    Recloned,
    /// Present and no update was requested.
    Unchanged,
    /// The cancellation flag was raised before the work finished.
    Cancelled,
    Failed(String),
}

/// Lines produced while syncing one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncLog {
    lines: Vec<String>,
}

impl SyncLog {
    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// What one worker hands back to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub id: RepositoryId,
    pub status: SyncStatus,
    pub log: SyncLog,
}

impl SyncReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, SyncStatus::Failed(_))
    }
}

/// Sync one repository, catching every error into the report.
///
/// On cancellation the buffered log is dropped.
pub fn sync_repository(
    git: &dyn Git,
    request: &SyncRequest,
    account: &Account,
    update: bool,
    cancel: &Cancellation,
) -> SyncReport {
    let mut log = SyncLog::default();
    let status = match sync_with_log(git, request, account, update, cancel, &mut log) {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(repository = %request.id, error = %e, "sync failed");
            log.line(format!("Error: {e}"));
            SyncStatus::Failed(e.to_string())
        }
    };
    if status == SyncStatus::Cancelled {
        log.clear();
    }
    SyncReport {
        id: request.id.clone(),
        status,
        log,
    }
}

/// Sync one repository and propagate the first error.
pub fn sync_with_log(
    git: &dyn Git,
    request: &SyncRequest,
    account: &Account,
    update: bool,
    cancel: &Cancellation,
    log: &mut SyncLog,
) -> Result<SyncStatus, SyncError> {
    let dir = &request.working_copy;
    let exists = dir.exists();

    if exists && !update {
        log.line(format!("Repository '{}' already exists", request.id));
        return Ok(SyncStatus::Unchanged);
    }
    if cancel.is_cancelled() {
        return Ok(SyncStatus::Cancelled);
    }

    log.line(format!("Pulling repository '{}':", request.id));

    let mut status = SyncStatus::Cloned;
    if exists {
        match update_existing(git, request, log) {
            Ok(()) => status = SyncStatus::Updated,
            Err(e) => {
                tracing::debug!(repository = %request.id, error = %e, "update failed; recloning");
                log.line("  - Pull failed; deleting repo");
                std::fs::remove_dir_all(dir).map_err(|e| io_err(dir, e))?;
                status = SyncStatus::Recloned;
            }
        }
        if cancel.is_cancelled() {
            return Ok(SyncStatus::Cancelled);
        }
    }

    if status != SyncStatus::Updated {
        log.line(format!("  - Cloning branch '{}'", request.default_branch));
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        git.clone_shallow(&request.ssh_url, &request.default_branch, dir)?;
    }

    // A finished clone always gets its identity, even when cancelled.
    log.line("  - Setting user and email");
    git.set_identity(dir, account)?;
    Ok(status)
}

fn update_existing(
    git: &dyn Git,
    request: &SyncRequest,
    log: &mut SyncLog,
) -> Result<(), SyncError> {
    let dir = &request.working_copy;
    log.line(format!("  - Checking out branch '{}'", request.default_branch));
    git.checkout(dir, &request.default_branch)?;
    log.line("  - Pulling latest changes");
    git.pull(dir)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
