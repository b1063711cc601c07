//! `auto-pr run`: the publish loop.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use autopr_core::WorkDir;
use autopr_sync::{
    Cancellation, FileCheckpoint, PublishOutcome, PublishReport, RunOptions, UpdatePipeline,
};

use super::{cancel_on_ctrl_c, forge, git, load_pulled, render_log, require_update_command, runtime};

/// Arguments for `auto-pr run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Pull each working copy before resetting it.
    #[arg(long)]
    pub pull_repos: bool,

    /// Seconds to wait after each push before the next repository.
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    pub push_delay: u64,
}

impl RunArgs {
    pub fn run(self, workdir: &WorkDir) -> Result<()> {
        let (config, mut state) = load_pulled(workdir)?;
        require_update_command(&config)?;
        let Some(account) = state.account.clone() else {
            return Ok(());
        };

        let git = git(&config);
        let forge = forge(&config);
        let repos_dir = workdir.repos_dir(Some(&config));
        let pipeline = UpdatePipeline {
            git: &git,
            forge: &forge,
            account: &account,
            template: &config.pr,
            update_command: &config.update_command,
            repos_dir: &repos_dir,
        };

        let runtime = runtime()?;
        let cancel = Cancellation::new();
        cancel_on_ctrl_c(&runtime, &cancel);

        let options = RunOptions {
            pull_repos: self.pull_repos,
            push_delay: Duration::from_secs(self.push_delay),
        };
        let mut checkpoint = FileCheckpoint::new(workdir.database_file());
        let summary = pipeline
            .run(
                &mut state,
                &mut checkpoint,
                &options,
                &cancel,
                &mut std::thread::sleep,
                &mut print_report,
            )
            .context("publish loop aborted")?;

        let created = summary.count(|o| matches!(o, PublishOutcome::PullRequestCreated(_)));
        let reused = summary.count(|o| matches!(o, PublishOutcome::PullRequestReused(_)));
        let unchanged = summary.count(|o| matches!(o, PublishOutcome::NothingToDo));
        let failed = summary.count(|o| matches!(o, PublishOutcome::Failed(_)));
        println!(
            "{} {created} created, {reused} reused, {unchanged} unchanged, {failed} failed",
            "✓".green()
        );
        if summary.cancelled {
            println!("{}", "Interrupted: remaining repositories left pending".yellow());
        }
        if failed > 0 {
            bail!("{failed} repositories failed; run again to retry them");
        }
        Ok(())
    }
}

fn print_report(report: &PublishReport) {
    println!("{}", render_report(report));
}

/// The report's log; a failure is already its last `Error:` line.
fn render_report(report: &PublishReport) -> String {
    format!("{}\n", render_log(&report.log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopr_core::RepositoryId;
    use autopr_sync::SyncLog;

    #[test]
    fn failure_is_shown_once() {
        let mut log = SyncLog::default();
        log.line("Resetting repository 'acme/x':");
        log.line("Error: boom");
        let report = PublishReport {
            id: RepositoryId::new("acme", "x"),
            outcome: PublishOutcome::Failed("boom".to_string()),
            log,
        };

        let out = render_report(&report);

        assert_eq!(out.matches("boom").count(), 1, "{out}");
        assert!(out.starts_with("Resetting repository 'acme/x':\n"), "{out}");
    }
}
