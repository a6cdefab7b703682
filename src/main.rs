mod config;
mod events;
mod github;
mod linker;
mod report;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use github::{GitHubApi, GitHubClient};
use linker::section::Section;

/// PR Linker: keeps pull requests that reference the same ticket linked to
/// each other across every repository of an organization.
#[derive(Parser, Debug)]
#[command(name = "pr-linker", version, about)]
struct Cli {
    /// Config file (defaults to .pr-linker.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle one webhook event (e.g., from a GitHub Actions step)
    Event {
        /// Webhook event name (issue_comment, pull_request)
        #[arg(long, env = "GITHUB_EVENT_NAME")]
        name: String,

        /// Path to the JSON event payload
        #[arg(long, env = "GITHUB_EVENT_PATH")]
        payload: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Cross-link every pull request of an organization now
    Link {
        /// GitHub organization login
        org: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the section markers to paste into a PR template
    Template,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Compute every rewrite but do not update any pull request
    #[arg(long)]
    dry_run: bool,

    /// Optional output file path for a markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;
    debug!(api_url = %config.github.api_url, ticket_host = %config.linker.ticket_host, "loaded configuration");

    match cli.command {
        Command::Template => {
            print_template(&config)?;
            Ok(())
        }
        Command::Event { name, payload, run } => {
            let span = info_span!("event", name = %name);
            handle_event(&config, &name, &payload, &run)
                .instrument(span)
                .await
        }
        Command::Link { org, run } => {
            let linker = linker::Linker::new(&config.linker)?;
            let api: Arc<dyn GitHubApi> = Arc::new(GitHubClient::new(&config)?);
            let built_report = linker.run(api, &org, run.dry_run).await?;
            finish(&built_report, &run)
        }
    }
}

/// Classify one webhook event and, when it qualifies, annotate the PR and
/// cross-link its organization.
async fn handle_event(
    config: &config::Config,
    name: &str,
    payload: &Path,
    run: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(payload = %payload.display(), "reading event payload");
    let payload = std::fs::read_to_string(payload).map_err(events::EventError::from)?;
    let trigger = events::classify(name, &payload, config)?;
    if let events::Trigger::Ignore(reason) = &trigger {
        info!(reason = %reason, "ignoring event");
        return Ok(());
    }

    let handler = events::EventHandler::new(config)?;
    let api: Arc<dyn GitHubApi> = Arc::new(GitHubClient::new(config)?);
    match handler.handle(api, trigger, run.dry_run).await? {
        Some(built_report) => finish(&built_report, run),
        None => Ok(()),
    }
}

fn finish(built_report: &report::LinkReport, run: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    report::output(built_report, run.output.as_deref())?;
    let failures = built_report.failures();
    if failures > 0 {
        warn!(failures, "some pull requests could not be updated");
    }
    info!(
        org = %built_report.org,
        related_prs = built_report.outcomes.len(),
        failures,
        "done"
    );
    Ok(())
}

/// Empty ticket and related-PR sections plus the auto-update marker.
fn print_template(config: &config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let ticket = Section::new(&config.events.ticket_section)?;
    let related = Section::new(&config.linker.section)?;
    println!("{}", config.events.auto_marker);
    println!();
    println!("{}", ticket.template());
    println!();
    println!("### Related PRs");
    println!("{}", related.template());
    Ok(())
}
