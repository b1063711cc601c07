//! Bounded fan-out of [`sync_repository`] over a tokio runtime.
//!
//! Each repository runs on the blocking pool behind a semaphore permit and
//! sends its [`SyncReport`] over a channel. A single consumer receives the
//! reports in completion order and hands them to `on_report`, so console
//! output never interleaves.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use autopr_core::Account;

use crate::cancel::Cancellation;
use crate::git::Git;
use crate::local::{sync_repository, SyncLog, SyncReport, SyncRequest, SyncStatus};

/// Worker count used when none is configured: the host's parallelism.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, usize::from)
}

/// Options shared by every worker of one batch.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub jobs: usize,
    /// Update working copies that already exist.
    pub update: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            update: false,
        }
    }
}

/// Sync every request with at most `options.jobs` running at once.
///
/// Failures and panics of one repository become that repository's report;
/// siblings keep going. Requests still queued when `cancel` is raised come
/// back as [`SyncStatus::Cancelled`].
pub async fn sync_all(
    git: Arc<dyn Git>,
    requests: Vec<SyncRequest>,
    account: Account,
    options: PoolOptions,
    cancel: Cancellation,
    mut on_report: impl FnMut(&SyncReport),
) -> Vec<SyncReport> {
    if requests.is_empty() {
        return Vec::new();
    }

    let jobs = options.jobs.max(1);
    let semaphore = Arc::new(Semaphore::new(jobs));
    let (tx, mut rx) = mpsc::channel::<SyncReport>(jobs * 2);
    let total = requests.len();
    tracing::debug!(total, jobs, "starting sync workers");

    for request in requests {
        let git = Arc::clone(&git);
        let account = account.clone();
        let cancel = cancel.clone();
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let update = options.update;

        tokio::spawn(async move {
            let id = request.id.clone();
            let report = match semaphore.acquire_owned().await {
                Ok(_permit) if cancel.is_cancelled() => cancelled(id),
                Ok(_permit) => tokio::task::spawn_blocking(move || {
                    sync_repository(git.as_ref(), &request, &account, update, &cancel)
                })
                .await
                .unwrap_or_else(|e| failed(id, format!("worker panicked: {e}"))),
                Err(_) => failed(id, "semaphore closed unexpectedly".to_string()),
            };
            let _ = tx.send(report).await;
        });
    }
    drop(tx);

    let mut reports = Vec::with_capacity(total);
    while let Some(report) = rx.recv().await {
        on_report(&report);
        reports.push(report);
    }

    let failures = reports.iter().filter(|r| r.is_failure()).count();
    tracing::info!(total, failures, "sync finished");
    reports
}

fn cancelled(id: autopr_core::RepositoryId) -> SyncReport {
    SyncReport {
        id,
        status: SyncStatus::Cancelled,
        log: SyncLog::default(),
    }
}

fn failed(id: autopr_core::RepositoryId, message: String) -> SyncReport {
    let mut log = SyncLog::default();
    log.line(format!("Error: {message}"));
    SyncReport {
        id,
        status: SyncStatus::Failed(message),
        log,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
