//! Status and bulk open/close of the pull requests tracked in the state.
//!
//! Read and administrative path only: `done` and `removed` are never touched.

use autopr_core::{PersistedState, RepositoryId};
use autopr_forge::{Forge, PrState};

/// A tracked pull request as last seen on the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPullRequest {
    pub id: RepositoryId,
    pub number: u64,
    pub url: String,
}

/// Every record bucketed by pull request presence, then remote state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub merged: Vec<TrackedPullRequest>,
    pub open: Vec<TrackedPullRequest>,
    pub closed: Vec<TrackedPullRequest>,
    /// Records without a tracked pull request.
    pub missing: Vec<RepositoryId>,
    /// The forge could not report on the pull request.
    pub failed: Vec<(RepositoryId, String)>,
}

/// Bucket every record of `state`. Merged wins over the raw open/closed flag.
pub fn classify(forge: &dyn Forge, state: &PersistedState) -> StatusReport {
    let mut report = StatusReport::default();
    for record in &state.repositories {
        let id = record.id();
        let Some(number) = record.existing_pr else {
            report.missing.push(id);
            continue;
        };
        match forge.pull_request(&id, number) {
            Ok(status) => {
                let tracked = TrackedPullRequest {
                    id,
                    number,
                    url: status.url,
                };
                if status.merged {
                    report.merged.push(tracked);
                } else if status.state == PrState::Open {
                    report.open.push(tracked);
                } else {
                    report.closed.push(tracked);
                }
            }
            Err(e) => {
                tracing::warn!(repository = %id, number, error = %e, "could not fetch pull request");
                report.failed.push((id, e.to_string()));
            }
        }
    }
    report
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Changed,
    /// Merged pull requests cannot be reopened or closed.
    AlreadyMerged { url: String },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeReport {
    pub id: RepositoryId,
    pub number: u64,
    pub change: StateChange,
}

/// Request `target` for every tracked pull request; merged ones are skipped
/// and failures are reported per record.
pub fn set_state_all(
    forge: &dyn Forge,
    state: &PersistedState,
    target: PrState,
) -> Vec<StateChangeReport> {
    state
        .repositories
        .iter()
        .filter_map(|record| record.existing_pr.map(|number| (record.id(), number)))
        .map(|(id, number)| {
            let change = set_state(forge, &id, number, target);
            if let StateChange::Failed(ref e) = change {
                tracing::warn!(repository = %id, number, error = %e, "could not set pull request state");
            }
            StateChangeReport { id, number, change }
        })
        .collect()
}

fn set_state(forge: &dyn Forge, id: &RepositoryId, number: u64, target: PrState) -> StateChange {
    let status = match forge.pull_request(id, number) {
        Ok(status) => status,
        Err(e) => return StateChange::Failed(e.to_string()),
    };
    if status.merged {
        return StateChange::AlreadyMerged { url: status.url };
    }
    match forge.set_pull_request_state(id, number, target) {
        Ok(()) => StateChange::Changed,
        Err(e) => StateChange::Failed(e.to_string()),
    }
}
