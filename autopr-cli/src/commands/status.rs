//! `auto-pr status`: where every tracked pull request stands.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use autopr_core::WorkDir;
use autopr_sync::{classify, pull_requests::TrackedPullRequest, StatusReport};

use super::{forge, load_config, load_state};

/// Arguments for `auto-pr status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, workdir: &WorkDir) -> Result<()> {
        let config = load_config(workdir)?;
        let state = load_state(workdir)?;
        let report = classify(&forge(&config), &state);

        if self.json {
            return print_json(report);
        }
        print_table(report);
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    merged: Vec<PullRequestJson>,
    open: Vec<PullRequestJson>,
    closed: Vec<PullRequestJson>,
    missing: Vec<String>,
    failed: Vec<FailureJson>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    merged: usize,
    open: usize,
    closed: usize,
    missing: usize,
    failed: usize,
}

#[derive(Serialize)]
struct PullRequestJson {
    repository: String,
    number: u64,
    url: String,
}

#[derive(Serialize)]
struct FailureJson {
    repository: String,
    error: String,
}

impl From<TrackedPullRequest> for PullRequestJson {
    fn from(pr: TrackedPullRequest) -> Self {
        Self {
            repository: pr.id.to_string(),
            number: pr.number,
            url: pr.url,
        }
    }
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "pr")]
    number: String,
    #[tabled(rename = "url / error")]
    detail: String,
}

fn print_json(report: StatusReport) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            merged: report.merged.len(),
            open: report.open.len(),
            closed: report.closed.len(),
            missing: report.missing.len(),
            failed: report.failed.len(),
        },
        merged: report.merged.into_iter().map(Into::into).collect(),
        open: report.open.into_iter().map(Into::into).collect(),
        closed: report.closed.into_iter().map(Into::into).collect(),
        missing: report.missing.iter().map(ToString::to_string).collect(),
        failed: report
            .failed
            .into_iter()
            .map(|(id, error)| FailureJson {
                repository: id.to_string(),
                error,
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(report: StatusReport) {
    println!(
        "{} merged | {} open | {} closed | {} without pull request",
        report.merged.len().to_string().magenta(),
        report.open.len().to_string().green(),
        report.closed.len().to_string().red(),
        report.missing.len(),
    );

    let mut rows = Vec::new();
    for (label, prs) in [
        ("MERGED", report.merged),
        ("OPEN", report.open),
        ("CLOSED", report.closed),
    ] {
        rows.extend(prs.into_iter().map(|pr| StatusTableRow {
            state: label.to_string(),
            repository: pr.id.to_string(),
            number: format!("#{}", pr.number),
            detail: pr.url,
        }));
    }
    rows.extend(report.failed.into_iter().map(|(id, error)| StatusTableRow {
        state: "ERROR".to_string(),
        repository: id.to_string(),
        number: String::new(),
        detail: error,
    }));

    if rows.is_empty() {
        println!("No pull requests tracked.");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
