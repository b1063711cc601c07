//! Merge a fresh discovery into the persisted state.
//!
//! The merge is asymmetric: the persisted list is the base and discovery is
//! reconciled into it, so lifecycle flags and pull request links survive a
//! refresh.
//!
//! | record is in …        | result                                                  |
//! |-----------------------|---------------------------------------------------------|
//! | discovery only        | appended, fresh lifecycle                               |
//! | state only            | `removed = true`, `existing_pr` kept                    |
//! | both                  | metadata refreshed, `removed = false`, `done`/PR kept   |

use std::collections::HashSet;

use crate::types::{Account, PersistedState, RepositoryId, RepositoryRecord};

/// Result of one discovery: the resolved account and the filtered repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub account: Account,
    pub repositories: Vec<RepositoryRecord>,
}

/// Reconcile `discovery` into `current`. The account always comes from the
/// discovery, since it is the newer of the two.
pub fn merge(mut current: PersistedState, discovery: Discovery) -> PersistedState {
    current.account = Some(discovery.account);

    let discovered: HashSet<RepositoryId> =
        discovery.repositories.iter().map(RepositoryRecord::id).collect();
    let mut known: HashSet<RepositoryId> =
        current.repositories.iter().map(RepositoryRecord::id).collect();

    for record in current.repositories.iter_mut() {
        if !discovered.contains(&record.id()) {
            if !record.removed {
                tracing::debug!(repository = %record.id(), "no longer discovered; marking removed");
            }
            record.removed = true;
        }
    }

    for incoming in discovery.repositories {
        let id = incoming.id();
        if known.insert(id.clone()) {
            current.repositories.push(RepositoryRecord {
                existing_pr: None,
                removed: false,
                done: false,
                ..incoming
            });
            continue;
        }

        if let Some(record) = current.repositories.iter_mut().find(|r| r.is(&id)) {
            if record.removed {
                tracing::debug!(repository = %id, "rediscovered; clearing removed flag");
            }
            record.ssh_url = incoming.ssh_url;
            record.default_branch = incoming.default_branch;
            record.removed = false;
        }
    }

    current
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
