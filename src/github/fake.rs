//! In-memory GitHubApi used by tests across the crate.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::types::{GitRef, Owner, PullRequest, PullUpdate, Repository};
use super::{GitHubApi, GitHubError};

#[derive(Default)]
pub struct InMemoryGitHub {
    repos: Vec<Repository>,
    pulls: Mutex<BTreeMap<(String, u64), PullRequest>>,
    failing_lists: HashSet<String>,
    failing_updates: HashSet<(String, u64)>,
    pub updates: Mutex<Vec<(String, u64, PullUpdate)>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Counts one list_pulls/update_pull call as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn repository(org: &str, name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        full_name: format!("{}/{}", org, name),
        owner: Owner {
            login: org.to_string(),
        },
    }
}

pub fn pull(org: &str, repo: &str, number: u64, head: &str, body: Option<&str>) -> PullRequest {
    PullRequest {
        number,
        body: body.map(str::to_string),
        head: GitRef {
            ref_name: head.to_string(),
            repo: Some(repository(org, repo)),
        },
        base: GitRef {
            ref_name: "main".to_string(),
            repo: Some(repository(org, repo)),
        },
    }
}

impl InMemoryGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, org: &str, name: &str) -> Self {
        self.repos.push(repository(org, name));
        self
    }

    /// Add a PR with an arbitrary head branch to `org/repo`.
    pub fn with_pull(self, org: &str, repo: &str, number: u64, head: &str, body: Option<&str>) -> Self {
        self.pulls
            .lock()
            .unwrap()
            .insert((format!("{}/{}", org, repo), number), pull(org, repo, number, head, body));
        self
    }

    pub fn with_body(self, org: &str, repo: &str, number: u64, body: &str) -> Self {
        self.with_pull(org, repo, number, "feature", Some(body))
    }

    pub fn failing_list(mut self, full_name: &str) -> Self {
        self.failing_lists.insert(full_name.to_string());
        self
    }

    pub fn failing_update(mut self, full_name: &str, number: u64) -> Self {
        self.failing_updates.insert((full_name.to_string(), number));
        self
    }

    pub fn body_of(&self, full_name: &str, number: u64) -> Option<String> {
        self.pulls
            .lock()
            .unwrap()
            .get(&(full_name.to_string(), number))
            .and_then(|pr| pr.body.clone())
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// Make list_pulls and update_pull take `millis` so calls overlap.
    pub fn with_latency(mut self, millis: u64) -> Self {
        self.latency = Some(Duration::from_millis(millis));
        self
    }

    /// Highest number of list_pulls/update_pull calls seen running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        guard
    }
}

fn not_found(url: String) -> GitHubError {
    GitHubError::Status {
        status: StatusCode::NOT_FOUND,
        url,
    }
}

#[async_trait]
impl GitHubApi for InMemoryGitHub {
    async fn list_repos(&self, org: &str) -> Result<Vec<Repository>, GitHubError> {
        Ok(self
            .repos
            .iter()
            .filter(|r| r.owner.login == org)
            .cloned()
            .collect())
    }

    async fn list_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, GitHubError> {
        let _in_flight = self.enter().await;
        let full_name = format!("{}/{}", owner, repo);
        if self.failing_lists.contains(&full_name) {
            return Err(GitHubError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                url: full_name,
            });
        }
        Ok(self
            .pulls
            .lock()
            .unwrap()
            .iter()
            .filter(|((name, _), _)| *name == full_name)
            .map(|(_, pr)| pr.clone())
            .collect())
    }

    async fn get_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, GitHubError> {
        let full_name = format!("{}/{}", owner, repo);
        self.pulls
            .lock()
            .unwrap()
            .get(&(full_name.clone(), number))
            .cloned()
            .ok_or_else(|| not_found(format!("{}#{}", full_name, number)))
    }

    async fn update_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: &PullUpdate,
    ) -> Result<(), GitHubError> {
        let _in_flight = self.enter().await;
        let full_name = format!("{}/{}", owner, repo);
        if self.failing_updates.contains(&(full_name.clone(), number)) {
            return Err(GitHubError::Status {
                status: StatusCode::FORBIDDEN,
                url: format!("{}#{}", full_name, number),
            });
        }
        let mut pulls = self.pulls.lock().unwrap();
        let pr = pulls
            .get_mut(&(full_name.clone(), number))
            .ok_or_else(|| not_found(format!("{}#{}", full_name, number)))?;
        pr.body = Some(update.body.clone());
        self.updates
            .lock()
            .unwrap()
            .push((full_name, number, update.clone()));
        Ok(())
    }
}
