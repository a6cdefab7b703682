pub mod branch;
pub mod types;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::github::{GitHubApi, GitHubError, PullRequest, PullUpdate, RepoSlug};
use crate::linker::section::Section;
use crate::linker::types::PrId;
use crate::linker::{LinkError, Linker};
use crate::report::types::{LinkReport, PublishOutcome, PublishStatus};
use branch::classify_branch;
use types::{IssueCommentPayload, PullRequestPayload};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Failed to read event payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to fetch {pr}: {source}")]
    FetchPull {
        pr: String,
        #[source]
        source: GitHubError,
    },

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// What an inbound event asks for.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Nothing to do; the reason is logged
    Ignore(String),
    /// A `!update` comment on a PR; the PR must be fetched first
    Refresh { repo: RepoSlug, number: u64 },
    /// A freshly opened PR that opted in; the payload already carries it
    Opened { repo: RepoSlug, pull: PullRequest },
}

/// Decide whether the webhook `event` with JSON `payload` triggers a run.
pub fn classify(event: &str, payload: &str, config: &Config) -> Result<Trigger, EventError> {
    let parse_error = |source| EventError::Payload {
        event: event.to_string(),
        source,
    };

    match event {
        "issue_comment" => {
            let payload: IssueCommentPayload = serde_json::from_str(payload).map_err(parse_error)?;
            if payload.sender.is_bot() {
                return Ok(Trigger::Ignore(format!("sent by bot {}", payload.sender.login)));
            }
            if payload.action != "created" {
                return Ok(Trigger::Ignore(format!("comment {}", payload.action)));
            }
            if payload.issue.pull_request.is_none() {
                return Ok(Trigger::Ignore("comment is on an issue, not a PR".to_string()));
            }
            if payload.comment.body.as_deref() != Some(config.events.update_command.as_str()) {
                return Ok(Trigger::Ignore("comment is not an update command".to_string()));
            }
            Ok(Trigger::Refresh {
                repo: RepoSlug::parse(&payload.repository.full_name)?,
                number: payload.issue.number,
            })
        }
        "pull_request" => {
            let payload: PullRequestPayload = serde_json::from_str(payload).map_err(parse_error)?;
            if payload.sender.is_bot() {
                return Ok(Trigger::Ignore(format!("sent by bot {}", payload.sender.login)));
            }
            if payload.action != "opened" {
                return Ok(Trigger::Ignore(format!("pull request {}", payload.action)));
            }
            let opted_in = payload
                .pull_request
                .body
                .as_deref()
                .is_some_and(|body| body.contains(&config.events.auto_marker));
            if !opted_in {
                return Ok(Trigger::Ignore("PR body has no auto-update marker".to_string()));
            }
            Ok(Trigger::Opened {
                repo: RepoSlug::parse(&payload.repository.full_name)?,
                pull: payload.pull_request,
            })
        }
        other => Ok(Trigger::Ignore(format!("unhandled event {}", other))),
    }
}

/// Runs the ticket annotation and the cross-link engine for triggered events.
pub struct EventHandler {
    linker: Linker,
    ticket_section: Section,
    ticket_host: String,
}

impl EventHandler {
    pub fn new(config: &Config) -> Result<EventHandler, EventError> {
        Ok(EventHandler {
            linker: Linker::new(&config.linker)?,
            ticket_section: Section::new(&config.events.ticket_section).map_err(LinkError::from)?,
            ticket_host: config.linker.ticket_host.clone(),
        })
    }

    /// Act on `trigger`. Returns None for ignored events.
    ///
    /// The ticket annotation is written before harvesting so the cross-link
    /// run sees the triggering PR's ticket reference.
    pub async fn handle(
        &self,
        api: Arc<dyn GitHubApi>,
        trigger: Trigger,
        dry_run: bool,
    ) -> Result<Option<LinkReport>, EventError> {
        let (repo, pull) = match trigger {
            Trigger::Ignore(reason) => {
                info!(reason = %reason, "ignoring event");
                return Ok(None);
            }
            Trigger::Refresh { repo, number } => {
                let pull = api
                    .get_pull(&repo.owner, &repo.repo, number)
                    .await
                    .map_err(|source| {
                        let pr = format!("{}#{}", repo, number);
                        error!(pr = %pr, error = %source, "could not fetch PR, aborting run");
                        EventError::FetchPull { pr, source }
                    })?;
                (repo, pull)
            }
            Trigger::Opened { repo, pull } => (repo, pull),
        };

        let annotation = self.annotate(api.as_ref(), &repo, &pull, dry_run).await;
        let mut report = self.linker.run(api, &repo.owner, dry_run).await?;
        report.annotation = annotation;
        Ok(Some(report))
    }

    /// Write the ticket section of a PR whose head branch names a ticket.
    /// A failed write is reported, never fatal.
    #[instrument(skip(self, api, pull, dry_run), fields(pr = %format!("{}#{}", repo, pull.number)))]
    async fn annotate(
        &self,
        api: &dyn GitHubApi,
        repo: &RepoSlug,
        pull: &PullRequest,
        dry_run: bool,
    ) -> Option<PublishOutcome> {
        let Some(ticket) = classify_branch(&pull.head.ref_name) else {
            debug!(branch = %pull.head.ref_name, "not a ticket branch");
            return None;
        };
        info!(ticket = %ticket.id, name = %ticket.name, "ticket branch");

        let id = PrId::new(repo.owner.as_str(), repo.repo.as_str(), pull.number);
        let body = pull.body.clone().unwrap_or_default();
        if !self.ticket_section.is_present(&body) {
            return Some(PublishOutcome::new(id, 0, PublishStatus::MissingSection));
        }
        let new_body = self
            .ticket_section
            .rewrite(&body, &ticket.annotation(&self.ticket_host));
        let status = if new_body == body {
            PublishStatus::Unchanged
        } else if dry_run {
            PublishStatus::DryRun
        } else {
            match api
                .update_pull(&repo.owner, &repo.repo, pull.number, &PullUpdate::body(new_body))
                .await
            {
                Ok(()) => PublishStatus::Updated,
                Err(e) => {
                    warn!(error = %e, "failed to write ticket annotation");
                    PublishStatus::Failed(e.to_string())
                }
            }
        };
        Some(PublishOutcome::new(id, 0, status))
    }
}
