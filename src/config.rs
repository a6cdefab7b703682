use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".pr-linker.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-linker.toml.
///
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub-specific settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Cross-link engine settings
    #[serde(default)]
    pub linker: LinkerConfig,

    /// Webhook event trigger settings
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// REST API root, overridable for GitHub Enterprise.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Host of ticket URLs, as in https://{ticket_host}/issue/ENG-12
    pub ticket_host: String,
    /// Name of the PR description section holding the related PR list
    pub section: String,
    /// Upper bound on concurrent GitHub requests during harvest and publish
    pub max_concurrency: usize,
    /// Issue description writes even when the rewritten body is unchanged
    pub always_write: bool,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            ticket_host: "linear.app".to_string(),
            section: "relatedPrs".to_string(),
            max_concurrency: 8,
            always_write: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Comment body that requests a refresh of a PR
    pub update_command: String,
    /// Marker in a freshly opened PR body that opts it into auto-population
    pub auto_marker: String,
    /// Name of the PR description section holding the ticket annotation
    pub ticket_section: String,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            update_command: "!update".to_string(),
            auto_marker: "<!--- pr-linker: auto -->".to_string(),
            ticket_section: "linearSection".to_string(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Config {
    /// Load configuration from `path`, or from .pr-linker.toml in the current
    /// directory when no path is given.
    /// Returns default config if the default file doesn't exist; an explicit
    /// path that doesn't exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)?
                } else {
                    Config::default()
                }
            }
        };

        if config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                config.github.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}
