pub mod types;

pub use types::{LinkReport, PublishOutcome, PublishStatus};

use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(org = %report.org, failures = report.failures()))]
pub fn output(report: &LinkReport, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

/// Format and print the report to the terminal with colors.
///
/// Cross-link run for org
/// Repositories: 12 | Pull requests: 340 | Tickets: 51 (4 shared)
///
/// ═══ Related PRs ═══
///   UPDATED     org/api#5  (1 related)
///   UNCHANGED   org/web#9  (1 related)
///
/// ═══ 1 updated, 1 unchanged, 0 failed ═══
fn print_terminal_report(report: &LinkReport) {
    println!();
    println!("Cross-link run for {}", report.org.bold());
    println!(
        "Repositories: {} | Pull requests: {} | Tickets: {} ({} shared)",
        report.repositories, report.pull_requests, report.tickets, report.shared_tickets
    );
    println!();

    if let Some(annotation) = &report.annotation {
        println!("═══ Ticket Annotation ═══");
        print_outcome_line(annotation, false);
        println!();
    }

    println!("═══ Related PRs ═══");
    if report.outcomes.is_empty() {
        println!("  No PRs share a ticket.");
    } else {
        for outcome in &report.outcomes {
            print_outcome_line(outcome, true);
        }
    }
    println!();

    println!("═══ {} ═══", summary_line(report));
    println!();
}

fn print_outcome_line(outcome: &PublishOutcome, with_related: bool) {
    let status = format!("{:<11}", outcome.status.to_string());
    let related = if with_related {
        format!("  ({} related)", outcome.related)
    } else {
        String::new()
    };
    let reason = match &outcome.status {
        PublishStatus::Failed(reason) => format!(": {}", reason),
        _ => String::new(),
    };
    println!(
        "  {} {}{}{}",
        colorize_status(&outcome.status, &status),
        outcome.pr,
        related,
        reason
    );
}

/// Write the report as a markdown file.
///
/// # Cross-link run for org
/// **Repositories:** 12 | **Pull requests:** 340 | **Tickets:** 51 (4 shared)
///
/// ## Related PRs
/// - **[UPDATED]** org/api#5 (1 related)
fn write_markdown_report(report: &LinkReport, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# Cross-link run for {}\n\n", report.org));
    md.push_str(&format!(
        "**Repositories:** {} | **Pull requests:** {} | **Tickets:** {} ({} shared)\n\n",
        report.repositories, report.pull_requests, report.tickets, report.shared_tickets
    ));

    if let Some(annotation) = &report.annotation {
        md.push_str("## Ticket Annotation\n\n");
        md.push_str(&format!("- **[{}]** {}{}\n\n", annotation.status, annotation.pr, failure_suffix(annotation)));
    }

    md.push_str("## Related PRs\n\n");
    if report.outcomes.is_empty() {
        md.push_str("No PRs share a ticket.\n\n");
    } else {
        for outcome in &report.outcomes {
            md.push_str(&format!(
                "- **[{}]** {} ({} related){}\n",
                outcome.status,
                outcome.pr,
                outcome.related,
                failure_suffix(outcome)
            ));
        }
        md.push('\n');
    }

    md.push_str(&format!("## {}\n", summary_line(report)));

    std::fs::write(path, md)?;
    Ok(())
}

fn failure_suffix(outcome: &PublishOutcome) -> String {
    match &outcome.status {
        PublishStatus::Failed(reason) => format!(": {}", reason),
        _ => String::new(),
    }
}

fn summary_line(report: &LinkReport) -> String {
    format!(
        "{} updated, {} unchanged, {} failed",
        report.count(&PublishStatus::Updated) + report.count(&PublishStatus::DryRun),
        report.count(&PublishStatus::Unchanged) + report.count(&PublishStatus::MissingSection),
        report.failures()
    )
}

/// Helper to colorize a publish status for terminal output.
fn colorize_status(status: &PublishStatus, text: &str) -> colored::ColoredString {
    match status {
        PublishStatus::Failed(_) => text.red().bold(),
        PublishStatus::MissingSection => text.yellow().bold(),
        PublishStatus::Updated | PublishStatus::DryRun => text.green().bold(),
        PublishStatus::Unchanged => text.dimmed(),
    }
}
