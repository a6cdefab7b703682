use std::collections::BTreeSet;

use tracing::debug;

use super::extract::ReferenceExtractor;
use super::types::{InvertedIndex, PullRequestRecord, RelationMap};

/// Map every ticket reference to the set of PRs whose body mentions it.
/// Records without references contribute nothing.
pub fn build_index(records: &[PullRequestRecord], extractor: &ReferenceExtractor) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for record in records {
        for reference in extractor.extract(&record.body) {
            index.entry(reference).or_default().insert(record.clone());
        }
    }
    debug!(records = records.len(), tickets = index.len(), "built inverted index");
    index
}

/// For every ticket mentioned by two or more PRs, relate each of those PRs
/// to all the others. Relations are merged across tickets, so a pair sharing
/// several tickets is listed once.
pub fn resolve(index: &InvertedIndex) -> RelationMap {
    let mut relations = RelationMap::new();
    for (reference, prs) in index {
        if prs.len() < 2 {
            continue;
        }
        debug!(ticket = %reference, prs = prs.len(), "shared ticket");
        for pr in prs {
            let others = prs
                .iter()
                .filter(|other| *other != pr)
                .map(|other| other.id.clone());
            relations
                .entry(pr.clone())
                .or_insert_with(BTreeSet::new)
                .extend(others);
        }
    }
    relations
}
