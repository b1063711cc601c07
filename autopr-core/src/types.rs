//! Domain types for the auto-pr state and configuration.
//!
//! Path fields use `PathBuf`. Everything that is persisted round-trips through
//! serde: the state file is JSON, the config file is YAML.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// `owner/name` identity of a repository. Unique within a [`PersistedState`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

impl RepositoryId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(format!("invalid repository '{s}'; expected OWNER/NAME")),
        }
    }
}

/// Identity used for commits: display name and commit email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// A repository as reported by discovery, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub owner: String,
    pub name: String,
    pub ssh_url: String,
    pub default_branch: String,
    pub public: bool,
    pub archived: bool,
}

impl RepositoryInfo {
    pub fn id(&self) -> RepositoryId {
        RepositoryId::new(&self.owner, &self.name)
    }

    /// A fresh record for this repository: no pull request, not done, not removed.
    pub fn to_record(&self) -> RepositoryRecord {
        RepositoryRecord {
            owner: self.owner.clone(),
            name: self.name.clone(),
            ssh_url: self.ssh_url.clone(),
            default_branch: self.default_branch.clone(),
            existing_pr: None,
            removed: false,
            done: false,
        }
    }
}

/// Per-repository lifecycle, tracked across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub owner: String,
    pub name: String,
    pub ssh_url: String,
    pub default_branch: String,
    /// Number of the pull request opened for this repository. Sticky across cycles.
    #[serde(default)]
    pub existing_pr: Option<u64>,
    /// Discovery no longer reports this repository.
    #[serde(default)]
    pub removed: bool,
    /// The current cycle reached a terminal outcome for this repository.
    #[serde(default)]
    pub done: bool,
}

impl RepositoryRecord {
    pub fn id(&self) -> RepositoryId {
        RepositoryId::new(&self.owner, &self.name)
    }

    pub fn is(&self, id: &RepositoryId) -> bool {
        self.owner == id.owner && self.name == id.name
    }
}

/// The "database": resolved account plus every repository ever discovered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default, alias = "user")]
    pub account: Option<Account>,
    #[serde(default)]
    pub repositories: Vec<RepositoryRecord>,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_PR_TITLE: &str = "Automatically generated PR";
pub const DEFAULT_PR_MESSAGE: &str = "Automatically generated commit";
pub const DEFAULT_PR_BODY: &str = "This is an automatically generated PR";
pub const DEFAULT_PR_BRANCH: &str = "autopr";

/// Whether a filter rule adds to or removes from the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Add,
    Remove,
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Add => write!(f, "add"),
            FilterMode::Remove => write!(f, "remove"),
        }
    }
}

/// One step of the repository selection pipeline. Unset predicates match everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub mode: FilterMode,
    /// `true` selects public repositories, `false` private ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    /// Full-match regexes applied to the repository name; any one must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_name: Option<Vec<String>>,
    /// Full-match regex applied to the owner login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_owner: Option<String>,
}

impl FilterRule {
    pub fn add() -> Self {
        Self::with_mode(FilterMode::Add)
    }

    pub fn remove() -> Self {
        Self::with_mode(FilterMode::Remove)
    }

    fn with_mode(mode: FilterMode) -> Self {
        Self {
            mode,
            public: None,
            archived: None,
            match_name: None,
            match_owner: None,
        }
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn match_name<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_name = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn match_owner(mut self, pattern: impl Into<String>) -> Self {
        self.match_owner = Some(pattern.into());
        self
    }
}

/// Read-only pull request template for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrTemplate {
    pub title: String,
    /// Commit message.
    pub message: String,
    /// Work branch pushed to every repository.
    pub branch: String,
    pub body: String,
    pub draft: bool,
}

impl Default for PrTemplate {
    fn default() -> Self {
        Self {
            title: DEFAULT_PR_TITLE.to_string(),
            message: DEFAULT_PR_MESSAGE.to_string(),
            branch: DEFAULT_PR_BRANCH.to_string(),
            body: DEFAULT_PR_BODY.to_string(),
            draft: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    /// Private key handed to ssh for clone and push.
    pub ssh_key_file: PathBuf,
}

/// Contents of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub credentials: Credentials,
    #[serde(default)]
    pub pr: PrTemplate,
    #[serde(default)]
    pub repositories: Vec<FilterRule>,
    #[serde(default)]
    pub update_command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_repos_dir: Option<PathBuf>,
}

impl Config {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            pr: PrTemplate::default(),
            repositories: Vec::new(),
            update_command: Vec::new(),
            custom_repos_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
