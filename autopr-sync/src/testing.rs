//! In-memory fakes for the git and forge boundaries.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use autopr_core::{Account, RepositoryId, RepositoryInfo};
use autopr_forge::{
    CodeSearch, Forge, ForgeError, NewPullRequest, PrState, PullRequestRef, PullRequestStatus,
};

use crate::cancel::Cancellation;
use crate::error::GitError;
use crate::git::Git;

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// Records every call as a short string; `clone` creates the destination.
#[derive(Default)]
pub struct FakeGit {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    /// `(operation, path fragment)`: fail only when the path contains the fragment.
    failing_for: Vec<(String, String)>,
    diff: Mutex<String>,
    /// Raise the flag while running this operation, as a Ctrl-C would.
    cancel_on: Option<(String, Cancellation)>,
}

impl FakeGit {
    pub fn failing(mut self, op: &str) -> Self {
        self.failing.insert(op.to_string());
        self
    }

    pub fn failing_for(mut self, op: &str, fragment: &str) -> Self {
        self.failing_for.push((op.to_string(), fragment.to_string()));
        self
    }

    pub fn cancelling_on(mut self, op: &str, cancel: &Cancellation) -> Self {
        self.cancel_on = Some((op.to_string(), cancel.clone()));
        self
    }

    pub fn with_diff(self, diff: &str) -> Self {
        self.set_diff(diff);
        self
    }

    pub fn set_diff(&self, diff: &str) {
        *self.diff.lock().unwrap() = diff.to_string();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    fn record(&self, op: &str, call: String, path: &Path) -> Result<(), GitError> {
        self.calls.lock().unwrap().push(call.clone());
        if let Some((o, cancel)) = &self.cancel_on {
            if o == op {
                cancel.cancel();
            }
        }
        let path = path.to_string_lossy();
        let fails = self.failing.contains(op)
            || self
                .failing_for
                .iter()
                .any(|(o, fragment)| o == op && path.contains(fragment.as_str()));
        if fails {
            return Err(GitError::Failed {
                command: call,
                code: Some(1),
                output: format!("fake {op} failure"),
            });
        }
        Ok(())
    }
}

impl Git for FakeGit {
    fn clone_shallow(&self, _url: &str, branch: &str, dest: &Path) -> Result<(), GitError> {
        self.record("clone", format!("clone {branch}"), dest)?;
        std::fs::create_dir_all(dest).unwrap();
        Ok(())
    }

    fn checkout(&self, dir: &Path, branch: &str) -> Result<(), GitError> {
        self.record("checkout", format!("checkout {branch}"), dir)
    }

    fn pull(&self, dir: &Path) -> Result<(), GitError> {
        self.record("pull", "pull".to_string(), dir)
    }

    fn reset_hard(&self, dir: &Path) -> Result<(), GitError> {
        self.record("reset", "reset".to_string(), dir)
    }

    fn checkout_reset_branch(&self, dir: &Path, branch: &str) -> Result<(), GitError> {
        self.record("branch", format!("branch {branch}"), dir)
    }

    fn add_all(&self, dir: &Path) -> Result<(), GitError> {
        self.record("add", "add".to_string(), dir)
    }

    fn staged_diff(&self, dir: &Path) -> Result<String, GitError> {
        self.record("diff", "diff".to_string(), dir)?;
        Ok(self.diff.lock().unwrap().clone())
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<(), GitError> {
        self.record("commit", format!("commit {message}"), dir)
    }

    fn push(&self, dir: &Path, branch: &str, force: bool) -> Result<(), GitError> {
        let call = if force {
            format!("push {branch} --force")
        } else {
            format!("push {branch}")
        };
        self.record("push", call, dir)
    }

    fn set_identity(&self, dir: &Path, account: &Account) -> Result<(), GitError> {
        self.record(
            "identity",
            format!("identity {} <{}>", account.name, account.email),
            dir,
        )
    }

    fn global_config(&self, key: &str) -> Result<Option<String>, GitError> {
        self.record("global", format!("global {key}"), Path::new(""))?;
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Forge
// ---------------------------------------------------------------------------

/// Pull requests live in a map keyed by `(repository, number)`.
#[derive(Default)]
pub struct FakeForge {
    pub prs: Mutex<Vec<(RepositoryId, u64, PullRequestStatus)>>,
    calls: Mutex<Vec<String>>,
    next_number: Mutex<u64>,
    fail_create: bool,
}

impl FakeForge {
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    pub fn with_pr(self, repo: RepositoryId, number: u64, state: PrState, merged: bool) -> Self {
        self.prs.lock().unwrap().push((
            repo,
            number,
            PullRequestStatus {
                state,
                merged,
                url: format!("https://example.com/pr/{number}"),
            },
        ));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("create")).count()
    }

    pub fn state_of(&self, repo: &RepositoryId, number: u64) -> Option<PullRequestStatus> {
        self.prs
            .lock()
            .unwrap()
            .iter()
            .find(|(r, n, _)| r == repo && *n == number)
            .map(|(_, _, s)| s.clone())
    }

    fn not_found(repo: &RepositoryId, number: u64) -> ForgeError {
        ForgeError::Status {
            method: "GET",
            url: format!("/repos/{repo}/pulls/{number}"),
            status: 404,
            message: "Not Found".to_string(),
        }
    }
}

impl Forge for FakeForge {
    fn resolve_account(&self) -> Result<Account, ForgeError> {
        Ok(Account {
            name: "Joe".to_string(),
            email: "joe@example.com".to_string(),
        })
    }

    fn list_repositories(&self) -> Result<Vec<RepositoryInfo>, ForgeError> {
        Ok(Vec::new())
    }

    fn create_pull_request(
        &self,
        repo: &RepositoryId,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef, ForgeError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create {repo} {}->{}", request.head, request.base));
        if self.fail_create {
            return Err(ForgeError::Status {
                method: "POST",
                url: format!("/repos/{repo}/pulls"),
                status: 422,
                message: "Validation Failed".to_string(),
            });
        }
        let mut next = self.next_number.lock().unwrap();
        *next += 1;
        let number = 100 + *next;
        let url = format!("https://example.com/pr/{number}");
        self.prs.lock().unwrap().push((
            repo.clone(),
            number,
            PullRequestStatus {
                state: PrState::Open,
                merged: false,
                url: url.clone(),
            },
        ));
        Ok(PullRequestRef { number, url })
    }

    fn pull_request(
        &self,
        repo: &RepositoryId,
        number: u64,
    ) -> Result<PullRequestStatus, ForgeError> {
        self.calls.lock().unwrap().push(format!("get {repo}#{number}"));
        self.state_of(repo, number)
            .ok_or_else(|| Self::not_found(repo, number))
    }

    fn set_pull_request_state(
        &self,
        repo: &RepositoryId,
        number: u64,
        state: PrState,
    ) -> Result<(), ForgeError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set {repo}#{number} {state}"));
        let mut prs = self.prs.lock().unwrap();
        let entry = prs
            .iter_mut()
            .find(|(r, n, _)| r == repo && *n == number)
            .ok_or_else(|| Self::not_found(repo, number))?;
        entry.2.state = state;
        Ok(())
    }

    fn search_code(&self, _search: &CodeSearch) -> Result<Vec<RepositoryInfo>, ForgeError> {
        Ok(Vec::new())
    }
}
