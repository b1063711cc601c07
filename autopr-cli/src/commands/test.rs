//! `auto-pr test`: dry run of the update command, one repository at a time.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use autopr_core::WorkDir;
use autopr_sync::{Cancellation, SyncLog, UpdatePipeline};

use super::{forge, git, load_pulled, print_log, require_update_command};

/// Arguments for `auto-pr test`.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Pull each working copy before applying the update command.
    #[arg(long)]
    pub pull_repos: bool,
}

impl TestArgs {
    pub fn run(self, workdir: &WorkDir) -> Result<()> {
        let (config, state) = load_pulled(workdir)?;
        require_update_command(&config)?;
        let Some(account) = state.account.as_ref() else {
            return Ok(());
        };

        let git = git(&config);
        let forge = forge(&config);
        let repos_dir = workdir.repos_dir(Some(&config));
        let pipeline = UpdatePipeline {
            git: &git,
            forge: &forge,
            account,
            template: &config.pr,
            update_command: &config.update_command,
            repos_dir: &repos_dir,
        };
        let cancel = Cancellation::new();

        let stdin = io::stdin();
        let mut input = stdin.lock();
        for record in state.repositories_to_process() {
            let mut log = SyncLog::default();
            let result = pipeline.preview(record, self.pull_repos, &cancel, &mut log);
            print_log(&log);
            match result {
                Ok(diff) if diff.is_empty() => {
                    println!("No changes for repository '{}'", record.id());
                }
                Ok(diff) => {
                    println!("Diff for repository '{}':", record.id().to_string().bold());
                    println!("{diff}");
                }
                Err(e) => {
                    println!("{} {}: {e}", "✗".red(), record.id());
                }
            }
            if !confirm(&mut input, "Continue?")? {
                return Ok(());
            }
            println!();
        }
        Ok(())
    }
}

/// `[y/N]` prompt; end of input counts as no.
fn confirm(input: &mut impl BufRead, question: &str) -> Result<bool> {
    print!("{question} [y/N]: ");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_accepts_yes_variants() {
        assert!(confirm(&mut "y\n".as_bytes(), "Continue?").unwrap());
        assert!(confirm(&mut " YES \n".as_bytes(), "Continue?").unwrap());
    }

    #[test]
    fn confirm_defaults_to_no() {
        assert!(!confirm(&mut "\n".as_bytes(), "Continue?").unwrap());
        assert!(!confirm(&mut "nope\n".as_bytes(), "Continue?").unwrap());
        assert!(!confirm(&mut "".as_bytes(), "Continue?").unwrap());
    }
}
