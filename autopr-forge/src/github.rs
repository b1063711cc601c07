//! GitHub REST v3 implementation of [`Forge`], on a blocking `ureq` agent.
//!
//! Wire structs are private and converted into core types at the edge so the
//! rest of the workspace never sees GitHub's JSON shapes.

use std::collections::HashSet;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use autopr_core::{Account, RepositoryId, RepositoryInfo};

use crate::error::ForgeError;
use crate::types::{CodeSearch, NewPullRequest, PrState, PullRequestRef, PullRequestStatus};
use crate::Forge;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PER_PAGE: usize = 100;
const TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// 1. Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEmail {
    email: String,
    #[serde(default)]
    primary: bool,
}

#[derive(Debug, Deserialize)]
struct ApiOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    name: String,
    owner: ApiOwner,
    ssh_url: String,
    default_branch: String,
    private: bool,
    #[serde(default)]
    archived: bool,
}

impl From<ApiRepository> for RepositoryInfo {
    fn from(repo: ApiRepository) -> Self {
        RepositoryInfo {
            owner: repo.owner.login,
            name: repo.name,
            ssh_url: repo.ssh_url,
            default_branch: repo.default_branch,
            public: !repo.private,
            archived: repo.archived,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiRepositoryRef {
    name: String,
    owner: ApiOwner,
}

#[derive(Debug, Deserialize)]
struct ApiSearchItem {
    repository: ApiRepositoryRef,
}

#[derive(Debug, Deserialize)]
struct ApiSearchPage {
    items: Vec<ApiSearchItem>,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    number: u64,
    html_url: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    merged: Option<bool>,
    #[serde(default)]
    merged_at: Option<String>,
}

impl ApiPullRequest {
    fn status(&self) -> PullRequestStatus {
        let state = match self.state.as_deref() {
            Some("closed") => PrState::Closed,
            _ => PrState::Open,
        };
        PullRequestStatus {
            state,
            merged: self.merged.unwrap_or(false) || self.merged_at.is_some(),
            url: self.html_url.clone(),
        }
    }
}

/// Display name falls back to the login; the email is the primary address.
fn account_from(user: ApiUser, emails: &[ApiEmail]) -> Result<Account, ForgeError> {
    let name = user
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(user.login);
    if name.is_empty() {
        return Err(ForgeError::MissingIdentity { field: "name" });
    }
    let email = emails
        .iter()
        .find(|e| e.primary)
        .map(|e| e.email.clone())
        .ok_or(ForgeError::MissingIdentity { field: "email" })?;
    Ok(Account { name, email })
}

// ---------------------------------------------------------------------------
// 2. Client
// ---------------------------------------------------------------------------

/// Token-authenticated GitHub client.
pub struct GithubForge {
    agent: ureq::Agent,
    api_url: String,
    token: String,
}

impl GithubForge {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    /// Point at a GitHub Enterprise instance or a test server.
    pub fn with_api_url(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(concat!("auto-pr/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn request(&self, method: &'static str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28")
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ForgeError> {
        let url = self.url(path);
        let mut request = self.request("GET", &url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        tracing::debug!(%url, "GET");
        let response = request
            .call()
            .map_err(|e| ForgeError::from_ureq("GET", &url, e))?;
        response
            .into_json()
            .map_err(|source| ForgeError::Decode { url, source })
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ForgeError> {
        let url = self.url(path);
        tracing::debug!(%url, method, "sending");
        let response = self
            .request(method, &url)
            .send_json(body)
            .map_err(|e| ForgeError::from_ureq(method, &url, e))?;
        response
            .into_json()
            .map_err(|source| ForgeError::Decode { url, source })
    }

    /// Fetch `path` page by page until a short page comes back.
    fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ForgeError> {
        let mut all = Vec::new();
        for page in 1.. {
            let items: Vec<T> = self.get(
                path,
                &[("per_page", PER_PAGE.to_string()), ("page", page.to_string())],
            )?;
            let last = items.len() < PER_PAGE;
            all.extend(items);
            if last {
                break;
            }
        }
        Ok(all)
    }

    fn repository(&self, owner: &str, name: &str) -> Result<RepositoryInfo, ForgeError> {
        let repo: ApiRepository = self.get(&format!("/repos/{owner}/{name}"), &[])?;
        Ok(repo.into())
    }
}

fn pulls_path(repo: &RepositoryId) -> String {
    format!("/repos/{}/{}/pulls", repo.owner, repo.name)
}

impl Forge for GithubForge {
    fn resolve_account(&self) -> Result<Account, ForgeError> {
        let user: ApiUser = self.get("/user", &[])?;
        let emails: Vec<ApiEmail> = self.get("/user/emails", &[])?;
        account_from(user, &emails)
    }

    fn list_repositories(&self) -> Result<Vec<RepositoryInfo>, ForgeError> {
        let repos: Vec<ApiRepository> = self.get_all("/user/repos")?;
        tracing::info!(count = repos.len(), "listed repositories");
        Ok(repos.into_iter().map(RepositoryInfo::from).collect())
    }

    fn create_pull_request(
        &self,
        repo: &RepositoryId,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef, ForgeError> {
        let body = json!({
            "title": request.title,
            "body": request.body,
            "head": request.head,
            "base": request.base,
            "draft": request.draft,
            "maintainer_can_modify": true,
        });
        let pr: ApiPullRequest = self.send("POST", &pulls_path(repo), body)?;
        Ok(PullRequestRef {
            number: pr.number,
            url: pr.html_url,
        })
    }

    fn pull_request(
        &self,
        repo: &RepositoryId,
        number: u64,
    ) -> Result<PullRequestStatus, ForgeError> {
        let pr: ApiPullRequest = self.get(&format!("{}/{number}", pulls_path(repo)), &[])?;
        Ok(pr.status())
    }

    fn set_pull_request_state(
        &self,
        repo: &RepositoryId,
        number: u64,
        state: PrState,
    ) -> Result<(), ForgeError> {
        let path = format!("{}/{number}", pulls_path(repo));
        let _: ApiPullRequest = self.send("PATCH", &path, json!({ "state": state.as_str() }))?;
        Ok(())
    }

    fn search_code(&self, search: &CodeSearch) -> Result<Vec<RepositoryInfo>, ForgeError> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        'pages: for page in 1.. {
            let result: ApiSearchPage = self.get(
                "/search/code",
                &[
                    ("q", search.query.clone()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ],
            )?;
            let last = result.items.len() < PER_PAGE;

            for item in result.items {
                let id = RepositoryId::new(item.repository.owner.login, item.repository.name);
                if !seen.insert(id.clone()) {
                    continue;
                }
                let repo = self.repository(&id.owner, &id.name)?;
                if search.accepts(&repo) {
                    found.push(repo);
                    if search.is_full(found.len()) {
                        break 'pages;
                    }
                }
            }
            if last {
                break;
            }
        }

        tracing::info!(query = %search.query, count = found.len(), "code search finished");
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// 3. Tests
// ---------------------------------------------------------------------------
