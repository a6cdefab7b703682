use crate::linker::types::PrId;

/// What happened to one PR's description during publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    /// Description rewritten on GitHub
    Updated,
    /// Related section already up to date, no write issued
    Unchanged,
    /// Description has no related section markers, no write issued
    MissingSection,
    /// Would have been written, but the run was a dry run
    DryRun,
    /// The write failed; the reason is the error message
    Failed(String),
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishStatus::Updated => write!(f, "UPDATED"),
            PublishStatus::Unchanged => write!(f, "UNCHANGED"),
            PublishStatus::MissingSection => write!(f, "NO SECTION"),
            PublishStatus::DryRun => write!(f, "DRY RUN"),
            PublishStatus::Failed(_) => write!(f, "FAILED"),
        }
    }
}

/// Publish result for one PR.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub pr: PrId,
    /// Number of related PRs listed in the section
    pub related: usize,
    pub status: PublishStatus,
}

impl PublishOutcome {
    pub fn new(pr: PrId, related: usize, status: PublishStatus) -> Self {
        Self { pr, related, status }
    }
}

/// Summary of one cross-link run over an organization.
#[derive(Debug)]
pub struct LinkReport {
    /// Organization that was harvested
    pub org: String,
    /// Repositories enumerated
    pub repositories: usize,
    /// Pull requests harvested, open and closed
    pub pull_requests: usize,
    /// Distinct ticket references found
    pub tickets: usize,
    /// Ticket references mentioned by two or more PRs
    pub shared_tickets: usize,
    /// One entry per PR with related PRs, in identity order
    pub outcomes: Vec<PublishOutcome>,
    /// Ticket annotation of the PR that triggered the run, if any
    pub annotation: Option<PublishOutcome>,
}

impl LinkReport {
    pub fn count(&self, status: &PublishStatus) -> usize {
        self.outcomes.iter().filter(|o| &o.status == status).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, PublishStatus::Failed(_)))
            .count()
    }
}
