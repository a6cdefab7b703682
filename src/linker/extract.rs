use std::collections::BTreeSet;

use regex::Regex;

use super::types::TicketRef;

/// Finds ticket URLs of the form `https://{host}/issue/{token}` in free text,
/// where the token is one or more ASCII alphanumerics or hyphens.
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    pattern: Regex,
}

impl ReferenceExtractor {
    pub fn new(ticket_host: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"https://{}/issue/[A-Za-z0-9-]+",
            regex::escape(ticket_host)
        ))?;
        Ok(Self { pattern })
    }

    /// Distinct ticket references in `text`. Empty text yields an empty set.
    pub fn extract(&self, text: &str) -> BTreeSet<TicketRef> {
        self.pattern
            .find_iter(text)
            .map(|m| TicketRef(m.as_str().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ReferenceExtractor {
        ReferenceExtractor::new("linear.app").unwrap()
    }

    #[test]
    fn test_extract_distinct_references() {
        let refs = extractor().extract(
            "Fixes https://linear.app/issue/ENG-12 and https://linear.app/issue/ENG-13",
        );
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&TicketRef("https://linear.app/issue/ENG-12".to_string())));
        assert!(refs.contains(&TicketRef("https://linear.app/issue/ENG-13".to_string())));
    }

    #[test]
    fn test_extract_collapses_duplicates() {
        let refs = extractor().extract(
            "https://linear.app/issue/ENG-12\nsee again https://linear.app/issue/ENG-12",
        );
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_extract_stops_at_token_boundary() {
        let refs = extractor().extract("(https://linear.app/issue/ENG-12/fix-login-bug)");
        let only: Vec<_> = refs.iter().map(|r| r.0.as_str()).collect();
        assert_eq!(only, vec!["https://linear.app/issue/ENG-12"]);
    }

    #[test]
    fn test_extract_empty_and_unrelated_text() {
        assert!(extractor().extract("").is_empty());
        assert!(extractor().extract("no links here").is_empty());
        assert!(extractor()
            .extract("http://linear.app/issue/ENG-1 https://example.com/issue/ENG-1")
            .is_empty());
    }

    #[test]
    fn test_host_is_matched_literally() {
        // The dot in the host must not match an arbitrary character
        assert!(extractor().extract("https://linearxapp/issue/ENG-1").is_empty());
        let custom = ReferenceExtractor::new("tracker.example.com").unwrap();
        assert_eq!(custom.extract("https://tracker.example.com/issue/abc-9").len(), 1);
    }
}
