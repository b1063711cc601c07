//! `auto-pr reset all|repos`: start a new update cycle.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use autopr_core::{RepositoryId, WorkDir};

use super::{load_state, save_state};

#[derive(Subcommand, Debug)]
pub enum ResetCommand {
    /// Clear the done flag of every repository.
    All,

    /// Clear the done flag of the named repositories.
    Repos {
        /// Repositories as OWNER/NAME.
        #[arg(required = true, value_name = "OWNER/NAME")]
        repos: Vec<RepositoryId>,
    },
}

pub fn run(command: ResetCommand, workdir: &WorkDir) -> Result<()> {
    let mut state = load_state(workdir)?;
    match command {
        ResetCommand::All => {
            state.reset_all();
            save_state(workdir, &state)?;
            println!("✓ Reset {} repositories", state.repositories.len());
        }
        ResetCommand::Repos { repos } => {
            let unknown = state.reset_selected(&repos);
            save_state(workdir, &state)?;
            for id in &unknown {
                eprintln!("{} repository '{id}' is not in the database", "warning:".yellow());
            }
            println!("✓ Reset {} repositories", repos.len() - unknown.len());
        }
    }
    Ok(())
}
