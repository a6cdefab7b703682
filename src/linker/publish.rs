use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, Instrument};

use super::section::Section;
use super::types::{related_section_content, RelationMap};
use crate::github::{GitHubApi, PullUpdate};
use crate::report::types::{PublishOutcome, PublishStatus};

#[derive(Debug, Clone, Copy)]
pub struct PublishOptions {
    pub max_concurrency: usize,
    /// Write even when the rewritten body equals the current one
    pub always_write: bool,
    pub dry_run: bool,
}

/// Rewrite the related section of every PR in `relations` and push the new
/// descriptions. Writes run concurrently; a failed write is recorded in its
/// outcome and never stops the others.
pub async fn publish(
    api: Arc<dyn GitHubApi>,
    relations: &RelationMap,
    section: &Section,
    options: PublishOptions,
) -> Vec<PublishOutcome> {
    let mut outcomes = Vec::with_capacity(relations.len());
    let permits = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending = BTreeSet::new();

    for (record, related) in relations {
        if related.is_empty() {
            continue;
        }
        let new_body = section.rewrite(&record.body, &related_section_content(related));
        let id = record.id.clone();

        if new_body == record.body && !options.always_write {
            let status = if section.is_present(&record.body) {
                PublishStatus::Unchanged
            } else {
                PublishStatus::MissingSection
            };
            debug!(pr = %id, status = %status, "skipping write");
            outcomes.push(PublishOutcome::new(id, related.len(), status));
            continue;
        }

        if options.dry_run {
            info!(pr = %id, related = related.len(), "dry run, not updating");
            outcomes.push(PublishOutcome::new(id, related.len(), PublishStatus::DryRun));
            continue;
        }

        pending.insert(id.clone());
        let api = Arc::clone(&api);
        let permits = Arc::clone(&permits);
        let related_count = related.len();
        let span = info_span!("publish", pr = %id);
        tasks.spawn(
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .expect("publish semaphore is never closed");
                let result = api
                    .update_pull(&id.org, &id.repo, id.number, &PullUpdate::body(new_body))
                    .await
                    .map_err(|e| e.to_string());
                (id, related_count, result)
            }
            .instrument(span),
        );
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, related, Ok(()))) => {
                info!(pr = %id, related, "updated related PRs");
                pending.remove(&id);
                outcomes.push(PublishOutcome::new(id, related, PublishStatus::Updated));
            }
            Ok((id, related, Err(reason))) => {
                error!(pr = %id, error = %reason, "failed to update PR description");
                pending.remove(&id);
                outcomes.push(PublishOutcome::new(id, related, PublishStatus::Failed(reason)));
            }
            Err(e) => error!(error = %e, "publish task failed"),
        }
    }

    // Tasks that panicked never reported back
    for id in pending {
        let related = relations
            .iter()
            .find(|(record, _)| record.id == id)
            .map_or(0, |(_, related)| related.len());
        outcomes.push(PublishOutcome::new(
            id,
            related,
            PublishStatus::Failed("update task did not complete".to_string()),
        ));
    }

    outcomes.sort_by(|a, b| a.pr.cmp(&b.pr));
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::InMemoryGitHub;
    use crate::linker::types::{PrId, PullRequestRecord};

    const EMPTY_SECTION: &str = "<!---\r\n<relatedPrs>\r\n-->\r\n<!---\r\n</relatedPrs>\r\n-->";

    fn options() -> PublishOptions {
        PublishOptions {
            max_concurrency: 4,
            always_write: false,
            dry_run: false,
        }
    }

    fn relation(repo: &str, number: u64, body: &str, related: &[(&str, u64)]) -> (PullRequestRecord, BTreeSet<PrId>) {
        (
            PullRequestRecord::new("org", repo, number, body),
            related.iter().map(|(r, n)| PrId::new("org", *r, *n)).collect(),
        )
    }

    #[tokio::test]
    async fn test_publish_writes_section() {
        let api = Arc::new(
            InMemoryGitHub::new()
                .with_repo("org", "a")
                .with_body("org", "a", 1, EMPTY_SECTION),
        );
        let relations: RelationMap = [relation("a", 1, EMPTY_SECTION, &[("b", 2)])].into_iter().collect();
        let section = Section::new("relatedPrs").unwrap();

        let outcomes = publish(api.clone(), &relations, &section, options()).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, PublishStatus::Updated);
        assert_eq!(
            api.body_of("org/a", 1).unwrap(),
            "<!---\r\n<relatedPrs>\r\n-->\r\n- https://github.com/org/b/pull/2\r\n<!---\r\n</relatedPrs>\r\n-->"
        );
    }

    #[tokio::test]
    async fn test_publish_skips_unchanged_and_missing_sections() {
        let api = Arc::new(InMemoryGitHub::new());
        let current = format!(
            "<!---\r\n<relatedPrs>\r\n-->\r\n{}\r\n<!---\r\n</relatedPrs>\r\n-->",
            PrId::new("org", "b", 2).descriptor()
        );
        let relations: RelationMap = [
            relation("a", 1, &current, &[("b", 2)]),
            relation("c", 3, "no markers here", &[("b", 2)]),
        ]
        .into_iter()
        .collect();
        let section = Section::new("relatedPrs").unwrap();

        let outcomes = publish(api.clone(), &relations, &section, options()).await;
        assert_eq!(outcomes[0].status, PublishStatus::Unchanged);
        assert_eq!(outcomes[1].status, PublishStatus::MissingSection);
        assert_eq!(api.update_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_always_write_issues_noop_writes() {
        let api = Arc::new(
            InMemoryGitHub::new()
                .with_repo("org", "c")
                .with_body("org", "c", 3, "no markers here"),
        );
        let relations: RelationMap = [relation("c", 3, "no markers here", &[("b", 2)])].into_iter().collect();
        let section = Section::new("relatedPrs").unwrap();
        let opts = PublishOptions {
            always_write: true,
            ..options()
        };

        let outcomes = publish(api.clone(), &relations, &section, opts).await;
        assert_eq!(outcomes[0].status, PublishStatus::Updated);
        assert_eq!(api.update_count(), 1);
        assert_eq!(api.body_of("org/c", 3).unwrap(), "no markers here");
    }

    #[tokio::test]
    async fn test_publish_dry_run_writes_nothing() {
        let api = Arc::new(InMemoryGitHub::new().with_body("org", "a", 1, EMPTY_SECTION));
        let relations: RelationMap = [relation("a", 1, EMPTY_SECTION, &[("b", 2)])].into_iter().collect();
        let section = Section::new("relatedPrs").unwrap();
        let opts = PublishOptions {
            dry_run: true,
            ..options()
        };

        let outcomes = publish(api.clone(), &relations, &section, opts).await;
        assert_eq!(outcomes[0].status, PublishStatus::DryRun);
        assert_eq!(api.update_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_others() {
        let api = Arc::new(
            InMemoryGitHub::new()
                .with_body("org", "a", 1, EMPTY_SECTION)
                .with_body("org", "b", 2, EMPTY_SECTION)
                .failing_update("org/a", 1),
        );
        let relations: RelationMap = [
            relation("a", 1, EMPTY_SECTION, &[("b", 2)]),
            relation("b", 2, EMPTY_SECTION, &[("a", 1)]),
        ]
        .into_iter()
        .collect();
        let section = Section::new("relatedPrs").unwrap();

        let outcomes = publish(api.clone(), &relations, &section, options()).await;
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].status, PublishStatus::Failed(_)));
        assert_eq!(outcomes[1].status, PublishStatus::Updated);
        assert_eq!(api.update_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_respects_max_concurrency() {
        let mut api = InMemoryGitHub::new().with_latency(20);
        let mut relations = RelationMap::new();
        for n in 1..=5 {
            let repo = format!("r{}", n);
            api = api.with_body("org", &repo, n, EMPTY_SECTION);
            let (record, related) = relation(&repo, n, EMPTY_SECTION, &[("hub", 99)]);
            relations.insert(record, related);
        }
        let api = Arc::new(api);
        let section = Section::new("relatedPrs").unwrap();
        let opts = PublishOptions {
            max_concurrency: 2,
            ..options()
        };

        let outcomes = publish(api.clone(), &relations, &section, opts).await;
        assert!(outcomes.iter().all(|o| o.status == PublishStatus::Updated));
        assert_eq!(api.update_count(), 5);
        assert_eq!(api.peak_in_flight(), 2);
    }
}
