//! One module per subcommand, plus the loading helpers they share.

pub mod init;
pub mod pull;
pub mod pull_requests;
pub mod reset;
pub mod run;
pub mod search;
pub mod status;
pub mod test;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use autopr_core::{Config, PersistedState, WorkDir};
use autopr_forge::GithubForge;
use autopr_sync::{Cancellation, CommandGit, SyncLog};

pub(crate) fn load_config(workdir: &WorkDir) -> Result<Config> {
    workdir.load_config().with_context(|| {
        format!(
            "failed to load configuration from {}",
            workdir.config_file().display()
        )
    })
}

pub(crate) fn load_state(workdir: &WorkDir) -> Result<PersistedState> {
    workdir.load_state().with_context(|| {
        format!(
            "failed to load database from {}",
            workdir.database_file().display()
        )
    })
}

pub(crate) fn save_state(workdir: &WorkDir, state: &PersistedState) -> Result<()> {
    workdir.save_state(state).with_context(|| {
        format!(
            "failed to write database to {}",
            workdir.database_file().display()
        )
    })
}

/// Config and state for commands that act on discovered repositories.
pub(crate) fn load_pulled(workdir: &WorkDir) -> Result<(Config, PersistedState)> {
    let config = load_config(workdir)?;
    let state = load_state(workdir)?;
    if state.needs_pulling() {
        bail!("No data found. Please run 'pull' first.");
    }
    Ok((config, state))
}

pub(crate) fn require_update_command(config: &Config) -> Result<()> {
    if config.update_command.is_empty() {
        bail!("No update command found. Please set an update command in the config.");
    }
    Ok(())
}

pub(crate) fn forge(config: &Config) -> GithubForge {
    GithubForge::new(config.credentials.api_key.clone())
}

pub(crate) fn git(config: &Config) -> CommandGit {
    CommandGit::new(config.credentials.ssh_key_file.clone())
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

/// Raise `cancel` on the first Ctrl-C. The listener lives on `runtime`.
pub(crate) fn cancel_on_ctrl_c(runtime: &tokio::runtime::Runtime, cancel: &Cancellation) {
    let cancel = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}",
                "Interrupted; finishing the current repository before stopping".yellow()
            );
            cancel.cancel();
        }
    });
}

pub(crate) fn print_log(log: &SyncLog) {
    if !log.lines().is_empty() {
        println!("{}", render_log(log));
    }
}

/// One line per log entry; `Error:` lines in red.
pub(crate) fn render_log(log: &SyncLog) -> String {
    log.lines()
        .iter()
        .map(|line| {
            if line.starts_with("Error:") {
                line.red().to_string()
            } else {
                line.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
