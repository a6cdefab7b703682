pub mod extract;
pub mod harvest;
pub mod index;
pub mod publish;
pub mod section;
pub mod types;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, info_span, Instrument};

use crate::config::LinkerConfig;
use crate::github::{GitHubApi, GitHubError};
use crate::report::types::LinkReport;
use extract::ReferenceExtractor;
use publish::PublishOptions;
use section::Section;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Failed to list repositories of {org}: {source}")]
    ListRepos {
        org: String,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to list pull requests of {repo}: {source}")]
    ListPulls {
        repo: String,
        #[source]
        source: GitHubError,
    },

    #[error("Harvest task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// The cross-link engine: harvest → index → resolve → rewrite → publish.
///
/// Holds only configuration. Every run builds its own index and relation
/// map and drops them when it returns.
pub struct Linker {
    extractor: ReferenceExtractor,
    section: Section,
    max_concurrency: usize,
    always_write: bool,
}

impl Linker {
    pub fn new(config: &LinkerConfig) -> Result<Linker, LinkError> {
        Ok(Linker {
            extractor: ReferenceExtractor::new(&config.ticket_host)?,
            section: Section::new(&config.section)?,
            max_concurrency: config.max_concurrency,
            always_write: config.always_write,
        })
    }

    /// Cross-link every PR in `org` that shares a ticket with another PR.
    ///
    /// Harvest failures abort the run before anything is written. Individual
    /// write failures are reported in the returned outcomes.
    pub async fn run(
        &self,
        api: Arc<dyn GitHubApi>,
        org: &str,
        dry_run: bool,
    ) -> Result<LinkReport, LinkError> {
        let span = info_span!("link_run", org, dry_run);
        async move {
            let harvested = harvest::harvest(Arc::clone(&api), org, self.max_concurrency).await?;

            let index = index::build_index(&harvested.records, &self.extractor);
            let shared_tickets = index.values().filter(|prs| prs.len() >= 2).count();
            let relations = index::resolve(&index);
            info!(
                tickets = index.len(),
                shared_tickets,
                related_prs = relations.len(),
                section = self.section.name(),
                "resolved related PRs"
            );

            let options = PublishOptions {
                max_concurrency: self.max_concurrency,
                always_write: self.always_write,
                dry_run,
            };
            let outcomes = publish::publish(api, &relations, &self.section, options).await;

            Ok(LinkReport {
                org: org.to_string(),
                repositories: harvested.repositories,
                pull_requests: harvested.records.len(),
                tickets: index.len(),
                shared_tickets,
                outcomes,
                annotation: None,
            })
        }
        .instrument(span)
        .await
    }
}
