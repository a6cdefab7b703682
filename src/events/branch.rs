use std::sync::OnceLock;

use regex::Regex;

/// A branch named after a ticket, e.g. `eng-123-fix-login-bug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketBranch {
    /// Uppercased ticket id, e.g. "ENG-123"
    pub id: String,
    /// Remainder of the branch name with hyphens as spaces, e.g. "fix login bug"
    pub name: String,
}

impl TicketBranch {
    /// Body of the ticket annotation section.
    pub fn annotation(&self, ticket_host: &str) -> String {
        format!(
            "Completes {id}\n\nhttps://{host}/issue/{id}",
            id = self.id,
            host = ticket_host
        )
    }
}

/// Classify a head branch name. Anything not shaped like
/// `<letters>-<digits>-<slug>` is not a ticket branch.
pub fn classify_branch(branch: &str) -> Option<TicketBranch> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^([a-zA-Z]+-\d+)-([\da-zA-Z-]+)$").expect("ticket branch regex compiles")
    });

    let caps = re.captures(branch)?;
    Some(TicketBranch {
        id: caps[1].to_uppercase(),
        name: caps[2].replace('-', " "),
    })
}
