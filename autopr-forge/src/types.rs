//! Values exchanged with the forge.

use std::fmt;

/// Remote pull request state. Merged pull requests are `Closed` with
/// [`PullRequestStatus::merged`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrState {
    Open,
    Closed,
}

impl PrState {
    pub fn as_str(self) -> &'static str {
        match self {
            PrState::Open => "open",
            PrState::Closed => "closed",
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to open a pull request from `head` into `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub draft: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestStatus {
    pub state: PrState,
    pub merged: bool,
    pub url: String,
}

impl PullRequestStatus {
    /// Open and not merged: safe to reuse instead of creating another.
    pub fn is_active(&self) -> bool {
        self.state == PrState::Open && !self.merged
    }
}

/// Parameters of a code search. `None` predicates match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSearch {
    pub query: String,
    pub public: Option<bool>,
    pub archived: Option<bool>,
    pub max_repos: Option<usize>,
}

impl CodeSearch {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            public: None,
            archived: None,
            max_repos: None,
        }
    }

    pub fn accepts(&self, repo: &autopr_core::RepositoryInfo) -> bool {
        self.public.map_or(true, |p| p == repo.public)
            && self.archived.map_or(true, |a| a == repo.archived)
    }

    pub fn is_full(&self, found: usize) -> bool {
        self.max_repos.is_some_and(|max| found >= max)
    }
}
