//! Per-repository update pipeline and the resumable publish loop.
//!
//! For one repository:
//!
//! 1. optionally re-sync the working copy (update + self-heal)
//! 2. `reset --hard`, checkout the default branch, create/reset the work branch
//! 3. run the update command inside the working copy
//! 4. stage everything; empty staged diff → done, nothing to publish
//! 5. commit, push (forced only when a pull request is already tracked)
//! 6. reuse the tracked pull request if it is still open, else create one
//! 7. mark done
//!
//! The loop checkpoints the whole state after every repository that reaches
//! a terminal outcome, so a restart only replays repositories not yet done.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use autopr_core::{
    state, working_copy, Account, PersistedState, PrTemplate, RepositoryId, RepositoryRecord,
    StateError,
};
use autopr_forge::{Forge, NewPullRequest, PullRequestRef};

use crate::cancel::Cancellation;
use crate::error::SyncError;
use crate::git::Git;
use crate::local::{sync_with_log, SyncLog, SyncRequest, SyncStatus};

// ---------------------------------------------------------------------------
// 1. Outcomes
// ---------------------------------------------------------------------------

/// Terminal result of publishing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The update command produced no staged change.
    NothingToDo,
    /// Pushed; the tracked pull request was still open.
    PullRequestReused(PullRequestRef),
    /// Pushed and opened a new pull request.
    PullRequestCreated(PullRequestRef),
    /// Any step failed; the repository stays pending.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub id: RepositoryId,
    pub outcome: PublishOutcome,
    pub log: SyncLog,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<PublishReport>,
    /// The loop stopped early because cancellation was requested.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn count(&self, pred: impl Fn(&PublishOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Update the working copy before each repository.
    pub pull_repos: bool,
    /// Pause after an iteration that pushed, before the next repository,
    /// even when the pull request step then failed.
    pub push_delay: Duration,
}

// ---------------------------------------------------------------------------
// 2. Checkpoints
// ---------------------------------------------------------------------------

/// Durable write of the full state, called after every terminal outcome.
pub trait Checkpoint {
    fn save(&mut self, state: &PersistedState) -> Result<(), StateError>;
}

/// Writes `db.json` atomically.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Checkpoint for FileCheckpoint {
    fn save(&mut self, state: &PersistedState) -> Result<(), StateError> {
        state::save_at(&self.path, state)
    }
}

// ---------------------------------------------------------------------------
// 3. Pipeline
// ---------------------------------------------------------------------------

/// Read-only inputs shared by every repository of one run.
pub struct UpdatePipeline<'a> {
    pub git: &'a dyn Git,
    pub forge: &'a dyn Forge,
    pub account: &'a Account,
    pub template: &'a PrTemplate,
    pub update_command: &'a [String],
    pub repos_dir: &'a Path,
}

impl UpdatePipeline<'_> {
    /// Publish one repository. Mutates `record` (`done`, `existing_pr`) only
    /// when a terminal outcome is reached.
    pub fn process(
        &self,
        record: &mut RepositoryRecord,
        pull_repo: bool,
        cancel: &Cancellation,
        log: &mut SyncLog,
    ) -> Result<PublishOutcome, SyncError> {
        self.publish(record, pull_repo, cancel, log, &mut false)
    }

    /// [`Self::process`], raising `pushed` as soon as the push succeeds so
    /// the caller can pace even when a later forge call fails.
    fn publish(
        &self,
        record: &mut RepositoryRecord,
        pull_repo: bool,
        cancel: &Cancellation,
        log: &mut SyncLog,
        pushed: &mut bool,
    ) -> Result<PublishOutcome, SyncError> {
        let dir = self.prepare_and_update(record, pull_repo, cancel, log)?;
        let diff = self.git.staged_diff(&dir)?;
        if diff.is_empty() {
            log.line("  - No changes");
            record.done = true;
            return Ok(PublishOutcome::NothingToDo);
        }

        log.line("  - Committing and pushing changes");
        self.git.commit(&dir, &self.template.message)?;
        let force = record.existing_pr.is_some();
        self.git.push(&dir, &self.template.branch, force)?;
        *pushed = true;

        let id = record.id();
        if let Some(number) = record.existing_pr {
            let status = self.forge.pull_request(&id, number)?;
            if status.is_active() {
                log.line(format!("  - Pull request: {}", status.url));
                record.done = true;
                return Ok(PublishOutcome::PullRequestReused(PullRequestRef {
                    number,
                    url: status.url,
                }));
            }
            tracing::debug!(repository = %id, number, merged = status.merged, "tracked pull request is no longer open");
        }

        let created = self.forge.create_pull_request(
            &id,
            &NewPullRequest {
                title: self.template.title.clone(),
                body: self.template.body.clone(),
                head: self.template.branch.clone(),
                base: record.default_branch.clone(),
                draft: self.template.draft,
            },
        )?;
        log.line(format!("  - Pull request: {}", created.url));
        record.existing_pr = Some(created.number);
        record.done = true;
        Ok(PublishOutcome::PullRequestCreated(created))
    }

    /// Steps 1–4 without committing; returns the staged diff.
    pub fn preview(
        &self,
        record: &RepositoryRecord,
        pull_repo: bool,
        cancel: &Cancellation,
        log: &mut SyncLog,
    ) -> Result<String, SyncError> {
        let dir = self.prepare_and_update(record, pull_repo, cancel, log)?;
        Ok(self.git.staged_diff(&dir)?)
    }

    fn prepare_and_update(
        &self,
        record: &RepositoryRecord,
        pull_repo: bool,
        cancel: &Cancellation,
        log: &mut SyncLog,
    ) -> Result<PathBuf, SyncError> {
        if pull_repo {
            let request = SyncRequest::new(record, self.repos_dir);
            let status = sync_with_log(self.git, &request, self.account, true, cancel, log)?;
            if status == SyncStatus::Cancelled {
                return Err(SyncError::Cancelled);
            }
        }
        let dir = self.prepare(record, log)?;
        self.apply_update(&dir, log)?;
        Ok(dir)
    }

    /// Reset the working copy and put it on a fresh work branch.
    pub fn prepare(&self, record: &RepositoryRecord, log: &mut SyncLog) -> Result<PathBuf, SyncError> {
        let id = record.id();
        let dir = working_copy(self.repos_dir, &id);
        if !dir.is_dir() {
            return Err(SyncError::MissingWorkingCopy { path: dir });
        }

        log.line(format!("Resetting repository '{id}':"));
        log.line("  - Resetting changes");
        self.git.reset_hard(&dir)?;
        log.line(format!("  - Checking out default branch '{}'", record.default_branch));
        self.git.checkout(&dir, &record.default_branch)?;
        log.line(format!("  - Creating or resetting branch '{}'", self.template.branch));
        self.git.checkout_reset_branch(&dir, &self.template.branch)?;
        Ok(dir)
    }

    /// Run the update command in `dir` and stage the result.
    pub fn apply_update(&self, dir: &Path, log: &mut SyncLog) -> Result<(), SyncError> {
        log.line("  - Running update command");
        run_update_command(dir, self.update_command)?;
        self.git.add_all(dir)?;
        Ok(())
    }

    /// Publish every pending repository in state order.
    ///
    /// Per-repository errors are reported and the loop moves on; a failed
    /// checkpoint aborts the run.
    pub fn run(
        &self,
        state: &mut PersistedState,
        checkpoint: &mut dyn Checkpoint,
        options: &RunOptions,
        cancel: &Cancellation,
        sleep: &mut dyn FnMut(Duration),
        on_report: &mut dyn FnMut(&PublishReport),
    ) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::default();
        let mut pause_pending = false;

        for id in state.pending_ids() {
            if pause_pending && !options.push_delay.is_zero() {
                tracing::debug!(delay = ?options.push_delay, "pausing after push");
                sleep(options.push_delay);
            }
            pause_pending = false;
            if cancel.is_cancelled() {
                tracing::info!("cancellation requested; stopping before {id}");
                summary.cancelled = true;
                break;
            }

            let Some(record) = state.find_mut(&id) else {
                continue;
            };
            let mut log = SyncLog::default();
            let mut pushed = false;
            let outcome = match self.publish(record, options.pull_repos, cancel, &mut log, &mut pushed) {
                Ok(outcome) => outcome,
                Err(SyncError::Cancelled) => {
                    tracing::info!("cancellation requested; {id} left pending");
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(repository = %id, error = %e, "publish failed");
                    log.line(format!("Error: {e}"));
                    PublishOutcome::Failed(e.to_string())
                }
            };

            if !matches!(outcome, PublishOutcome::Failed(_)) {
                checkpoint.save(state)?;
            }
            pause_pending = pushed;

            let report = PublishReport { id, outcome, log };
            on_report(&report);
            summary.reports.push(report);
        }

        Ok(summary)
    }
}

/// Run `command` (argv form) with `dir` as the working directory.
pub fn run_update_command(dir: &Path, command: &[String]) -> Result<String, SyncError> {
    let (program, args) = command.split_first().ok_or(SyncError::EmptyUpdateCommand)?;
    let shown = command.join(" ");
    tracing::debug!(command = %shown, dir = %dir.display(), "running update command");

    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|source| crate::error::io_err(dir, source))?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }
    Err(SyncError::UpdateCommand {
        command: shown,
        code: output.status.code(),
        output: format!("{stdout}{}", String::from_utf8_lossy(&output.stderr)),
    })
}

// ---------------------------------------------------------------------------
// 4. Tests
// ---------------------------------------------------------------------------
