use serde::{Deserialize, Serialize};

use super::GitHubError;

/// A repository as returned by the GitHub repository listing endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository name without owner (e.g., "api")
    pub name: String,
    /// "owner/name"
    pub full_name: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// The subset of a GitHub pull request the linker consumes.
/// Used for both list and single-PR responses.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    /// Description; GitHub sends null for an empty description
    #[serde(default)]
    pub body: Option<String>,
    pub head: GitRef,
    pub base: GitRef,
}

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// Null when the repository behind the ref was deleted
    #[serde(default)]
    pub repo: Option<Repository>,
}

/// Body for PATCH /repos/{owner}/{repo}/pulls/{number}. Only the
/// description is ever written; GitHub leaves omitted fields alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullUpdate {
    pub body: String,
}

impl PullUpdate {
    pub fn body(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// The owner/name pair addressing a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Split a "owner/repo" full name.
    pub fn parse(full_name: &str) -> Result<RepoSlug, GitHubError> {
        match full_name.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(RepoSlug {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(GitHubError::InvalidRepoName(full_name.to_string())),
        }
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_slug() {
        let slug = RepoSlug::parse("org/repo").unwrap();
        assert_eq!(slug.owner, "org");
        assert_eq!(slug.repo, "repo");
        assert_eq!(slug.to_string(), "org/repo");
    }

    #[test]
    fn test_parse_invalid_repo_slug() {
        assert!(RepoSlug::parse("org").is_err());
        assert!(RepoSlug::parse("/repo").is_err());
        assert!(RepoSlug::parse("org/").is_err());
        assert!(RepoSlug::parse("org/repo/extra").is_err());
    }

    #[test]
    fn test_pull_request_null_body() {
        let pr: PullRequest = serde_json::from_value(serde_json::json!({
            "number": 7,
            "title": "Fix login",
            "body": null,
            "head": { "ref": "eng-1-fix-login", "repo": null },
            "base": {
                "ref": "main",
                "repo": { "name": "api", "full_name": "org/api", "owner": { "login": "org" } }
            }
        }))
        .unwrap();
        assert_eq!(pr.number, 7);
        assert!(pr.body.is_none());
        assert_eq!(pr.head.ref_name, "eng-1-fix-login");
        assert_eq!(pr.base.repo.unwrap().full_name, "org/api");
    }

    #[test]
    fn test_pull_update_writes_only_body() {
        let json = serde_json::to_value(PullUpdate::body("hello")).unwrap();
        assert_eq!(json, serde_json::json!({ "body": "hello" }));
    }
}
