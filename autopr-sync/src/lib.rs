//! # autopr-sync
//!
//! Working copy synchronisation, the update pipeline and pull request
//! administration.
//!
//! - [`local`] / [`pool`]: clone, update or heal working copies, in parallel
//! - [`pipeline`]: reset, run the update command, commit, push, open or reuse
//!   a pull request, checkpoint
//! - [`pull_requests`]: status buckets and bulk close / reopen
//! - [`git`]: the [`Git`] boundary and its `git` command implementation

pub mod cancel;
pub mod error;
pub mod git;
pub mod local;
pub mod pipeline;
pub mod pool;
pub mod pull_requests;

#[cfg(test)]
mod testing;

pub use cancel::Cancellation;
pub use error::{GitError, SyncError};
pub use git::{global_identity, CommandGit, Git};
pub use local::{sync_repository, SyncLog, SyncReport, SyncRequest, SyncStatus};
pub use pipeline::{
    Checkpoint, FileCheckpoint, PublishOutcome, PublishReport, RunOptions, RunSummary,
    UpdatePipeline,
};
pub use pool::{default_jobs, sync_all, PoolOptions};
pub use pull_requests::{classify, set_state_all, StateChange, StatusReport};
