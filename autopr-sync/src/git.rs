//! Git boundary: every operation is a pass/fail command against a working
//! directory, with output captured for the error on failure.

use std::path::{Path, PathBuf};
use std::process::Command;

use autopr_core::Account;

use crate::error::GitError;

/// Git operations the sync engine and pipeline need.
///
/// Implementations must be `Send + Sync`; sync workers share one instance.
pub trait Git: Send + Sync {
    /// `git clone --depth 1 --branch <branch> <url> <dest>`
    fn clone_shallow(&self, url: &str, branch: &str, dest: &Path) -> Result<(), GitError>;

    fn checkout(&self, dir: &Path, branch: &str) -> Result<(), GitError>;

    fn pull(&self, dir: &Path) -> Result<(), GitError>;

    fn reset_hard(&self, dir: &Path) -> Result<(), GitError>;

    /// Create `branch` at `HEAD`, or reset it there if it exists, and check it out.
    fn checkout_reset_branch(&self, dir: &Path, branch: &str) -> Result<(), GitError>;

    fn add_all(&self, dir: &Path) -> Result<(), GitError>;

    /// Text of `git diff --staged`; empty when nothing is staged.
    fn staged_diff(&self, dir: &Path) -> Result<String, GitError>;

    fn commit(&self, dir: &Path, message: &str) -> Result<(), GitError>;

    /// `git push -u origin <branch>`, with `--force` when `force` is set.
    fn push(&self, dir: &Path, branch: &str, force: bool) -> Result<(), GitError>;

    /// Write `user.name` / `user.email` into the working copy's local config.
    fn set_identity(&self, dir: &Path, account: &Account) -> Result<(), GitError>;

    /// Value of `key` in the global git config, `None` when unset.
    fn global_config(&self, key: &str) -> Result<Option<String>, GitError>;
}

/// Read the commit identity from the global git config.
///
/// Both `user.name` and `user.email` must be set and non-empty.
pub fn global_identity(git: &dyn Git) -> Result<Option<Account>, GitError> {
    let name = git.global_config("user.name")?.filter(|v| !v.is_empty());
    let email = git.global_config("user.email")?.filter(|v| !v.is_empty());
    Ok(name.zip(email).map(|(name, email)| Account { name, email }))
}

// ---------------------------------------------------------------------------
// Command-line implementation
// ---------------------------------------------------------------------------

/// [`Git`] backed by the `git` executable.
///
/// Network operations (clone, pull, push) authenticate with `ssh_key_file`
/// through `GIT_SSH_COMMAND` when one is set.
#[derive(Debug, Clone, Default)]
pub struct CommandGit {
    ssh_key_file: Option<PathBuf>,
}

impl CommandGit {
    pub fn new(ssh_key_file: impl Into<PathBuf>) -> Self {
        Self {
            ssh_key_file: Some(ssh_key_file.into()),
        }
    }

    /// Use whatever ssh configuration the environment provides.
    pub fn without_key() -> Self {
        Self::default()
    }

    fn ssh_command(&self) -> Option<String> {
        self.ssh_key_file
            .as_ref()
            .map(|key| format!("ssh -i {} -o IdentitiesOnly=yes", key.display()))
    }

    fn in_dir(dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir).args(args);
        cmd
    }

    fn with_ssh(&self, mut cmd: Command) -> Command {
        if let Some(ssh) = self.ssh_command() {
            cmd.env("GIT_SSH_COMMAND", ssh);
        }
        cmd
    }
}

/// Run `cmd`; stdout on success, stdout and stderr combined on failure.
fn run(mut cmd: Command) -> Result<String, GitError> {
    let command = describe(&cmd);
    tracing::debug!(%command, "running");
    let output = cmd.output().map_err(|source| GitError::Spawn {
        command: command.clone(),
        source,
    })?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(GitError::Failed {
        command,
        code: output.status.code(),
        output: format!("{stdout}{stderr}"),
    })
}

fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Git for CommandGit {
    fn clone_shallow(&self, url: &str, branch: &str, dest: &Path) -> Result<(), GitError> {
        let mut cmd = Command::new("git");
        cmd.args(["clone", "--depth", "1", "--branch", branch, url])
            .arg(dest);
        run(self.with_ssh(cmd)).map(drop)
    }

    fn checkout(&self, dir: &Path, branch: &str) -> Result<(), GitError> {
        run(Self::in_dir(dir, &["checkout", branch])).map(drop)
    }

    fn pull(&self, dir: &Path) -> Result<(), GitError> {
        run(self.with_ssh(Self::in_dir(dir, &["pull", "--depth", "1"]))).map(drop)
    }

    fn reset_hard(&self, dir: &Path) -> Result<(), GitError> {
        run(Self::in_dir(dir, &["reset", "--hard"])).map(drop)
    }

    fn checkout_reset_branch(&self, dir: &Path, branch: &str) -> Result<(), GitError> {
        run(Self::in_dir(dir, &["checkout", "-B", branch])).map(drop)
    }

    fn add_all(&self, dir: &Path) -> Result<(), GitError> {
        run(Self::in_dir(dir, &["add", "--all"])).map(drop)
    }

    fn staged_diff(&self, dir: &Path) -> Result<String, GitError> {
        run(Self::in_dir(dir, &["diff", "--staged"]))
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<(), GitError> {
        run(Self::in_dir(dir, &["commit", "-m", message])).map(drop)
    }

    fn push(&self, dir: &Path, branch: &str, force: bool) -> Result<(), GitError> {
        let mut args = vec!["push", "-u", "origin", branch];
        if force {
            args.push("--force");
        }
        run(self.with_ssh(Self::in_dir(dir, &args))).map(drop)
    }

    fn set_identity(&self, dir: &Path, account: &Account) -> Result<(), GitError> {
        run(Self::in_dir(dir, &["config", "user.name", account.name.as_str()]))?;
        run(Self::in_dir(dir, &["config", "user.email", account.email.as_str()])).map(drop)
    }

    fn global_config(&self, key: &str) -> Result<Option<String>, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(["config", "--global", key]);
        match run(cmd) {
            Ok(value) => Ok(Some(value.trim().to_string())),
            // `git config` exits 1 when the key is unset.
            Err(GitError::Failed { code: Some(1), .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
