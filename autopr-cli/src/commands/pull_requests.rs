//! `auto-pr close` / `auto-pr reopen`

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use autopr_core::WorkDir;
use autopr_forge::PrState;
use autopr_sync::{set_state_all, StateChange};

use super::{forge, load_config, load_state};

/// Arguments for `auto-pr close`.
#[derive(Args, Debug)]
pub struct CloseArgs {}

impl CloseArgs {
    pub fn run(self, workdir: &WorkDir) -> Result<()> {
        apply(workdir, PrState::Closed)
    }
}

/// Arguments for `auto-pr reopen`.
#[derive(Args, Debug)]
pub struct ReopenArgs {}

impl ReopenArgs {
    pub fn run(self, workdir: &WorkDir) -> Result<()> {
        apply(workdir, PrState::Open)
    }
}

fn apply(workdir: &WorkDir, target: PrState) -> Result<()> {
    let config = load_config(workdir)?;
    let state = load_state(workdir)?;
    let reports = set_state_all(&forge(&config), &state, target);

    let verb = match target {
        PrState::Open => "Reopened",
        PrState::Closed => "Closed",
    };
    let mut failed = 0;
    for report in &reports {
        match &report.change {
            StateChange::Changed => {
                println!("{} {verb} {}#{}", "✓".green(), report.id, report.number);
            }
            StateChange::AlreadyMerged { url } => {
                println!("- {}#{} is merged, skipping ({url})", report.id, report.number);
            }
            StateChange::Failed(e) => {
                failed += 1;
                println!("{} {}#{}: {e}", "✗".red(), report.id, report.number);
            }
        }
    }

    if reports.is_empty() {
        println!("No pull requests tracked.");
    }
    if failed > 0 {
        bail!("{failed} pull requests could not be updated");
    }
    Ok(())
}
