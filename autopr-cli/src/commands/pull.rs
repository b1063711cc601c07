//! `auto-pr pull`: discover, filter, reconcile, then sync working copies.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use autopr_core::{reconcile, Account, Discovery, FilterEngine, WorkDir};
use autopr_forge::Forge;
use autopr_sync::{
    default_jobs, global_identity, sync_all, Cancellation, Git, PoolOptions, SyncRequest,
    SyncStatus,
};

use super::{cancel_on_ctrl_c, forge, git, load_config, load_state, print_log, runtime, save_state};

/// Arguments for `auto-pr pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Reuse the repository list already in the database.
    #[arg(long)]
    pub no_fetch_repo_list: bool,

    /// Pull working copies that already exist.
    #[arg(long)]
    pub update_repos: bool,

    /// Number of repositories synced at once. Defaults to the CPU count.
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Take the commit identity from the global git config instead of the
    /// GitHub profile.
    #[arg(long)]
    pub use_global_git_config: bool,
}

impl PullArgs {
    pub fn run(self, workdir: &WorkDir) -> Result<()> {
        let config = load_config(workdir)?;
        let forge = forge(&config);
        let git = Arc::new(git(&config));

        let account = if self.use_global_git_config {
            global_identity(&*git)
                .context("failed to read the global git config")?
                .context("user.name and user.email must both be set in the global git config")?
        } else {
            forge
                .resolve_account()
                .context("failed to resolve the GitHub account")?
        };
        println!(
            "Running under user '{}' with email '{}'",
            account.name, account.email
        );

        let mut state = load_state(workdir)?;
        if self.no_fetch_repo_list {
            if state.needs_pulling() {
                bail!("No data found. Run 'pull' without --no-fetch-repo-list first.");
            }
            println!("Not gathering repository list");
        } else {
            println!("Gathering repository list...");
            let engine = FilterEngine::compile(&config.repositories)?;
            let candidates = forge
                .list_repositories()
                .context("failed to list repositories")?;
            let selected = engine.select(&candidates);
            println!(
                "  {} of {} repositories selected",
                selected.len(),
                candidates.len()
            );

            println!("Updating database");
            state = reconcile::merge(
                state,
                Discovery {
                    account: account.clone(),
                    repositories: selected,
                },
            );
            save_state(workdir, &state)?;
        }

        let repos_dir = workdir.repos_dir(Some(&config));
        let requests: Vec<SyncRequest> = state
            .repositories
            .iter()
            .filter(|r| !r.removed)
            .map(|r| SyncRequest::new(r, &repos_dir))
            .collect();

        println!("Pulling repositories...");
        let options = PoolOptions {
            jobs: self.jobs.unwrap_or_else(default_jobs),
            update: self.update_repos,
        };
        let failures = sync(git, requests, account, options)?;
        if failures > 0 {
            bail!("{failures} repositories could not be synced");
        }
        Ok(())
    }
}

/// Run the worker pool on a fresh runtime; returns the failure count.
fn sync(
    git: Arc<dyn Git>,
    requests: Vec<SyncRequest>,
    account: Account,
    options: PoolOptions,
) -> Result<usize> {
    let runtime = runtime()?;
    let cancel = Cancellation::new();
    cancel_on_ctrl_c(&runtime, &cancel);

    let reports = runtime.block_on(sync_all(
        git,
        requests,
        account,
        options,
        cancel.clone(),
        |report| print_log(&report.log),
    ));

    let count = |pred: fn(&SyncStatus) -> bool| {
        reports.iter().filter(|r| pred(&r.status)).count()
    };
    let cloned = count(|s| matches!(s, SyncStatus::Cloned | SyncStatus::Recloned));
    let updated = count(|s| matches!(s, SyncStatus::Updated));
    let failed = count(|s| matches!(s, SyncStatus::Failed(_)));
    let cancelled = count(|s| matches!(s, SyncStatus::Cancelled));

    println!(
        "{} {cloned} cloned, {updated} updated, {failed} failed",
        "✓".green()
    );
    if cancel.is_cancelled() {
        println!("{} {cancelled} repositories skipped", "Interrupted:".yellow());
    }
    Ok(failed)
}
