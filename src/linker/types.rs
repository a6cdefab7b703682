use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identity of a pull request: (org, repo, number).
/// Ordering is by org, then repo, then number, which keeps every
/// collection built from it deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrId {
    pub org: String,
    pub repo: String,
    pub number: u64,
}

impl PrId {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Markdown list item linking to this PR, as written into related sections.
    pub fn descriptor(&self) -> String {
        format!("- https://github.com/{}/{}/pull/{}", self.org, self.repo, self.number)
    }
}

impl fmt::Display for PrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.org, self.repo, self.number)
    }
}

/// A harvested pull request. Immutable for the duration of one run.
///
/// Equality, hashing and ordering consider only `id`: two records for the
/// same PR are the same record even if fetched independently.
#[derive(Debug, Clone)]
pub struct PullRequestRecord {
    pub id: PrId,
    /// Description text, empty when GitHub returned null
    pub body: String,
}

impl PullRequestRecord {
    pub fn new(org: &str, repo: &str, number: u64, body: impl Into<String>) -> Self {
        Self {
            id: PrId::new(org, repo, number),
            body: body.into(),
        }
    }
}

impl PartialEq for PullRequestRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PullRequestRecord {}

impl std::hash::Hash for PullRequestRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for PullRequestRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PullRequestRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

/// Canonical ticket URL, e.g. "https://linear.app/issue/ENG-12".
/// Compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketRef(pub String);

impl fmt::Display for TicketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ticket reference → every PR whose body mentions it.
pub type InvertedIndex = BTreeMap<TicketRef, BTreeSet<PullRequestRecord>>;

/// PR → the other PRs sharing at least one ticket with it.
/// Never contains a PR in its own set.
pub type RelationMap = BTreeMap<PullRequestRecord, BTreeSet<PrId>>;

/// Related-section content for one PR: one descriptor per line.
pub fn related_section_content(related: &BTreeSet<PrId>) -> String {
    related
        .iter()
        .map(PrId::descriptor)
        .collect::<Vec<_>>()
        .join("\n")
}
