use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, Instrument};

use super::types::PullRequestRecord;
use super::LinkError;
use crate::github::{GitHubApi, PullRequest, Repository};

/// Everything harvested from one organization.
#[derive(Debug, Default)]
pub struct Harvest {
    pub repositories: usize,
    /// Sorted by PR identity
    pub records: Vec<PullRequestRecord>,
}

/// Enumerate every repository of `org` and every PR (open and closed) in
/// each, listing repositories concurrently with at most `max_concurrency`
/// requests in flight.
///
/// Any listing failure aborts the whole harvest: a partial PR set would
/// silently drop relations.
pub async fn harvest(
    api: Arc<dyn GitHubApi>,
    org: &str,
    max_concurrency: usize,
) -> Result<Harvest, LinkError> {
    let repos = api
        .list_repos(org)
        .await
        .map_err(|source| LinkError::ListRepos {
            org: org.to_string(),
            source,
        })?;
    info!(org, repos = repos.len(), "listed repositories");

    let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for repo in &repos {
        let api = Arc::clone(&api);
        let permits = Arc::clone(&permits);
        let owner = repo.owner.login.clone();
        let name = repo.name.clone();
        let span = info_span!("harvest_repo", repo = %repo.full_name);
        tasks.spawn(
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .expect("harvest semaphore is never closed");
                let pulls = api.list_pulls(&owner, &name).await.map_err(|source| {
                    LinkError::ListPulls {
                        repo: format!("{}/{}", owner, name),
                        source,
                    }
                })?;
                debug!(pulls = pulls.len(), "listed pull requests");
                Ok::<_, LinkError>((owner, name, pulls))
            }
            .instrument(span),
        );
    }

    let mut records = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (owner, name, pulls) = match joined.map_err(LinkError::Join)? {
            Ok(listing) => listing,
            Err(e) => {
                error!(error = %e, "harvest failed, aborting run");
                tasks.abort_all();
                return Err(e);
            }
        };
        records.extend(pulls.iter().map(|pr| to_record(&owner, &name, pr)));
    }

    records.sort();
    records.dedup();
    info!(org, repos = repos.len(), prs = records.len(), "harvest complete");
    Ok(Harvest {
        repositories: repos.len(),
        records,
    })
}

/// Owner and repo come from the PR's base repository; the listed repository
/// only fills in when GitHub omits it.
fn to_record(listed_owner: &str, listed_name: &str, pr: &PullRequest) -> PullRequestRecord {
    let (org, repo) = match &pr.base.repo {
        Some(Repository { owner, name, .. }) => (owner.login.as_str(), name.as_str()),
        None => (listed_owner, listed_name),
    };
    PullRequestRecord::new(org, repo, pr.number, pr.body.clone().unwrap_or_default())
}
