//! Forge boundary: the remote service that hosts repositories and pull
//! requests.
//!
//! [`Forge`] is the narrow contract the pipeline consumes. [`GithubForge`]
//! implements it over the GitHub REST API; tests supply in-memory fakes.

pub mod error;
pub mod github;
pub mod types;

pub use error::ForgeError;
pub use github::GithubForge;
pub use types::{CodeSearch, NewPullRequest, PrState, PullRequestRef, PullRequestStatus};

use autopr_core::{Account, RepositoryId, RepositoryInfo};

/// Remote calls keyed by `owner/name`. Every call is fallible.
///
/// Implementations must be `Send + Sync`; the CLI shares one instance between
/// the discovery step and the publish loop.
pub trait Forge: Send + Sync {
    /// Display name and commit email of the authenticated account.
    fn resolve_account(&self) -> Result<Account, ForgeError>;

    /// Every repository the account can access.
    fn list_repositories(&self) -> Result<Vec<RepositoryInfo>, ForgeError>;

    fn create_pull_request(
        &self,
        repo: &RepositoryId,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef, ForgeError>;

    fn pull_request(&self, repo: &RepositoryId, number: u64)
        -> Result<PullRequestStatus, ForgeError>;

    fn set_pull_request_state(
        &self,
        repo: &RepositoryId,
        number: u64,
        state: PrState,
    ) -> Result<(), ForgeError>;

    /// Unique repositories containing code that matches `search.query`.
    fn search_code(&self, search: &CodeSearch) -> Result<Vec<RepositoryInfo>, ForgeError>;
}
