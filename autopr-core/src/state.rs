//! Persisted state store (`db.json`).
//!
//! The whole state is read into memory at start and rewritten in full on
//! every checkpoint. A missing file is an empty state.
//!
//! Write flow: serialize → `.json.tmp` sibling → `chmod 0600` → `rename`.
//! The `.tmp` file lives next to the target so the rename never crosses
//! filesystems.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{state_io, StateError};
use crate::types::{PersistedState, RepositoryId, RepositoryRecord};

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load and validate the state at `path`. Returns an empty state if absent.
pub fn load_at(path: &Path) -> Result<PersistedState, StateError> {
    if !path.exists() {
        return Ok(PersistedState::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| state_io(path, e))?;
    let state: PersistedState =
        serde_json::from_str(&contents).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    state.validate()?;
    Ok(state)
}

/// Atomically replace the state at `path`.
pub fn save_at(path: &Path, state: &PersistedState) -> Result<(), StateError> {
    state.validate()?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| state_io(dir, e))?;
    }

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| state_io(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(state_io(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Lifecycle operations
// ---------------------------------------------------------------------------

impl PersistedState {
    /// `true` until the first successful discovery has resolved an account.
    pub fn needs_pulling(&self) -> bool {
        self.account.is_none()
    }

    /// Every `owner/name` must be unique.
    pub fn validate(&self) -> Result<(), StateError> {
        let mut seen = HashSet::new();
        for record in &self.repositories {
            if !seen.insert(record.id()) {
                return Err(StateError::DuplicateRepository { id: record.id() });
            }
        }
        Ok(())
    }

    /// Records the pipeline still has to handle: not removed, not done.
    pub fn repositories_to_process(&self) -> impl Iterator<Item = &RepositoryRecord> {
        self.repositories.iter().filter(|r| !r.removed && !r.done)
    }

    /// Ids of [`Self::repositories_to_process`], in state order.
    pub fn pending_ids(&self) -> Vec<RepositoryId> {
        self.repositories_to_process().map(RepositoryRecord::id).collect()
    }

    pub fn find(&self, id: &RepositoryId) -> Option<&RepositoryRecord> {
        self.repositories.iter().find(|r| r.is(id))
    }

    pub fn find_mut(&mut self, id: &RepositoryId) -> Option<&mut RepositoryRecord> {
        self.repositories.iter_mut().find(|r| r.is(id))
    }

    /// Start a new cycle for every repository.
    pub fn reset_all(&mut self) {
        for record in &mut self.repositories {
            record.done = false;
        }
    }

    /// Start a new cycle for the named repositories.
    ///
    /// Returns the ids that are not in the state.
    pub fn reset_selected(&mut self, ids: &[RepositoryId]) -> Vec<RepositoryId> {
        let mut unknown = Vec::new();
        for id in ids {
            match self.find_mut(id) {
                Some(record) => {
                    record.done = false;
                    tracing::debug!(repository = %id, "reset");
                }
                None => unknown.push(id.clone()),
            }
        }
        unknown
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StateError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| state_io(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StateError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
