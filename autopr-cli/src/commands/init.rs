//! `auto-pr init --api-key <key> [--ssh-key-file <path>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use autopr_core::{workdir, Credentials, WorkDir};

/// Create the work directory files.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// GitHub API token. May be a `${NAME}` placeholder expanded at load time.
    #[arg(long, env = "APR_API_KEY")]
    pub api_key: String,

    /// Private key used for git over ssh. Defaults to ~/.ssh/id_rsa.
    #[arg(long, value_name = "PATH")]
    pub ssh_key_file: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self, workdir: &WorkDir) -> Result<()> {
        let ssh_key_file = match self.ssh_key_file {
            Some(path) => path,
            None => dirs::home_dir()
                .context("could not determine home directory; pass --ssh-key-file")?
                .join(".ssh")
                .join("id_rsa"),
        };
        let credentials = Credentials {
            api_key: self.api_key,
            ssh_key_file,
        };

        let report = workdir::init(workdir, credentials).with_context(|| {
            format!(
                "failed to initialise work directory {}",
                workdir.location.display()
            )
        })?;

        for warning in report.warnings() {
            eprintln!("{} {warning}", "warning:".yellow());
        }
        println!(
            "✓ Work directory ready at {}",
            workdir.location.display()
        );
        println!("  Repositories: {}", report.repos_dir.display());
        Ok(())
    }
}
