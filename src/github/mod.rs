#[cfg(test)]
pub mod fake;
pub mod types;

pub use types::{PullRequest, PullUpdate, RepoSlug, Repository};

use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

const USER_AGENT: &str = "pr-linker";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub listing failed: {0}")]
    Listing(#[from] octocrab::Error),

    #[error("GitHub API returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("Invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// The hosting operations the linker consumes.
/// Implementations must be Send + Sync so harvest tasks can share one client.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Every repository owned by `org`, across all pages.
    async fn list_repos(&self, org: &str) -> Result<Vec<Repository>, GitHubError>;

    /// Every pull request of `owner/repo` in all states, across all pages.
    async fn list_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, GitHubError>;

    async fn get_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, GitHubError>;

    /// Partial update; only the description changes.
    async fn update_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: &PullUpdate,
    ) -> Result<(), GitHubError>;
}

/// GitHub REST client. Listings go through octocrab, which follows the
/// `Link` pagination headers; single-PR reads and writes use reqwest.
pub struct GitHubClient {
    octocrab: Octocrab,
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    /// Build a client from config. Fails with MissingToken when neither the
    /// config file nor GITHUB_TOKEN provides a token.
    pub fn new(config: &Config) -> Result<GitHubClient, GitHubError> {
        let token = config.github_token().ok_or(GitHubError::MissingToken)?;
        let api_url = config.github.api_url.trim_end_matches('/').to_string();
        let octocrab = Octocrab::builder()
            .personal_token(token.clone())
            .base_uri(api_url.as_str())?
            .build()?;
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(GitHubClient {
            octocrab,
            http,
            api_url,
            token,
        })
    }

    /// GET `route` and every page after it.
    async fn get_all_pages<T, P>(&self, route: &str, params: &P) -> Result<Vec<T>, GitHubError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let mut page: Page<T> = self.octocrab.get(route, Some(params)).await?;
        let mut items = Vec::new();
        let mut pages = 0usize;

        loop {
            pages += 1;
            debug!(route, page = pages, items = page.items.len(), "received page");
            items.append(&mut page.items);
            match self.octocrab.get_page::<T>(&page.next).await? {
                Some(next) => page = next,
                None => break,
            }
        }

        debug!(pages, total = items.len(), "pagination complete");
        Ok(items)
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    #[instrument(skip(self))]
    async fn list_repos(&self, org: &str) -> Result<Vec<Repository>, GitHubError> {
        let route = format!("/orgs/{}/repos", org);
        self.get_all_pages(&route, &[("type", "all"), ("per_page", PAGE_SIZE)])
            .await
    }

    #[instrument(skip(self))]
    async fn list_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, GitHubError> {
        let route = format!("/repos/{}/{}/pulls", owner, repo);
        self.get_all_pages(&route, &[("state", "all"), ("per_page", PAGE_SIZE)])
            .await
    }

    #[instrument(skip(self))]
    async fn get_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, GitHubError> {
        let url = format!("{}/repos/{}/{}/pulls/{}", self.api_url, owner, repo, number);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        let pull = check_status(response, &url)?.json::<PullRequest>().await?;
        debug!(head = %pull.head.ref_name, "received PR");
        Ok(pull)
    }

    #[instrument(skip(self, update), fields(body_len = update.body.len()))]
    async fn update_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: &PullUpdate,
    ) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/{}/pulls/{}", self.api_url, owner, repo, number);
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(update)
            .send()
            .await?;
        check_status(response, &url)?;
        Ok(())
    }
}

fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(GitHubError::Status {
            status,
            url: url.to_string(),
        })
    }
}
