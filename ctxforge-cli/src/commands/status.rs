//! `ctxforge status`: artifact freshness and pending changes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use ctxforge_core::CorpusState;
use ctxforge_sync::{classifier::format_age, classify, pending, ClassifyOptions, CorpusReport, Pending};

use super::{describe_base, Workspace};

/// Arguments for `ctxforge status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub async fn run(self, start: &Path) -> Result<ExitCode> {
        let workspace = Workspace::open(start).await?;
        let artifact_root = workspace.artifact_root();
        let report = classify(
            &artifact_root,
            &workspace.root,
            &ClassifyOptions::from_config(&workspace.config, &workspace.root),
        )
        .context("failed to inspect the artifact tree")?;
        let pending = pending(&workspace.source, &workspace.root, &workspace.config)
            .await
            .context("failed to compute pending changes")?;

        if self.json {
            print_json(&artifact_root, &report, &pending)?;
        } else {
            print_table(&workspace.root, &artifact_root, &report, &pending);
        }
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    artifact_root: &'a Path,
    #[serde(flatten)]
    state: CorpusState,
    documents: usize,
    unfilled: &'a [PathBuf],
    source_newest: Option<String>,
    artifact_newest: Option<String>,
    pending: PendingJson,
}

#[derive(Serialize)]
struct PendingJson {
    reference: Option<String>,
    head: String,
    base: String,
    changed_paths: usize,
    relevant_paths: usize,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "artifacts")]
    artifacts: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "last generated")]
    last_generated: String,
    #[tabled(rename = "pending")]
    pending: String,
}

fn print_json(artifact_root: &Path, report: &CorpusReport, pending: &Pending) -> Result<()> {
    let payload = StatusJson {
        artifact_root,
        state: report.state,
        documents: report.documents,
        unfilled: &report.unfilled,
        source_newest: report.source_newest.map(|t| t.to_rfc3339()),
        artifact_newest: report.artifact_newest.map(|t| t.to_rfc3339()),
        pending: PendingJson {
            reference: pending.reference.as_ref().map(|r| r.0.clone()),
            head: pending.head.0.clone(),
            base: describe_base(&pending.base),
            changed_paths: pending.raw,
            relevant_paths: pending.relevant,
        },
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(repo: &Path, artifact_root: &Path, report: &CorpusReport, pending: &Pending) {
    println!(
        "ctxforge v{} | {} documents | head {}",
        env!("CARGO_PKG_VERSION"),
        report.documents,
        pending.head.short(),
    );

    let separator = "■".repeat(67).bright_black().to_string();
    println!("{separator}");
    println!(
        "Indicators: {} READY  {} OUTDATED  {} UNFILLED  {} NEW",
        state_indicator(&CorpusState::Ready),
        state_indicator(&CorpusState::Outdated { days_behind: 0 }),
        state_indicator(&CorpusState::Unfilled { count: 0 }),
        state_indicator(&CorpusState::New),
    );
    println!("{separator}");

    let artifacts = artifact_root
        .strip_prefix(repo)
        .unwrap_or(artifact_root)
        .display()
        .to_string();
    let row = StatusTableRow {
        artifacts,
        state: format!("{} {}", state_indicator(&report.state), state_label(&report.state)),
        detail: state_detail(report),
        last_generated: age_or_never(report.artifact_newest),
        pending: pending_detail(pending),
    };
    let mut table = Table::new(vec![row]);
    table.with(Style::rounded());
    println!("{table}");

    for path in report.unfilled.iter().take(5) {
        println!("  {}  {}", "✎".yellow(), path.display());
    }
    if report.unfilled.len() > 5 {
        println!("  … +{} more", report.unfilled.len() - 5);
    }

    match report.state {
        CorpusState::New => println!("Run 'ctxforge init' to build the artifact tree."),
        CorpusState::Unfilled { .. } => {
            println!("Fill the marked sections, or configure the llm generator and run 'ctxforge update --force'.")
        }
        CorpusState::Outdated { .. } => println!("Run 'ctxforge update' to regenerate stale artifacts."),
        CorpusState::Ready if pending.relevant > 0 => {
            println!("Run 'ctxforge preview' to see what the pending changes affect.")
        }
        CorpusState::Ready => {}
    }
}

fn state_label(state: &CorpusState) -> &'static str {
    match state {
        CorpusState::New => "NEW",
        CorpusState::Unfilled { .. } => "UNFILLED",
        CorpusState::Outdated { .. } => "OUTDATED",
        CorpusState::Ready => "READY",
    }
}

fn state_indicator(state: &CorpusState) -> String {
    match state {
        CorpusState::New => "■".bright_black().bold().to_string(),
        CorpusState::Unfilled { .. } => "■".magenta().bold().to_string(),
        CorpusState::Outdated { .. } => "■".yellow().bold().to_string(),
        CorpusState::Ready => "■".green().bold().to_string(),
    }
}

fn state_detail(report: &CorpusReport) -> String {
    match report.state {
        CorpusState::New => "no artifact tree".to_string(),
        CorpusState::Unfilled { count } => format!("{count} unfilled"),
        CorpusState::Outdated { days_behind } => {
            format!("{days_behind} day{} behind", if days_behind == 1 { "" } else { "s" })
        }
        CorpusState::Ready => "up to date".to_string(),
    }
}

fn age_or_never(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map(format_age).unwrap_or_else(|| "never".to_string())
}

fn pending_detail(pending: &Pending) -> String {
    match &pending.reference {
        None => format!("{} path(s), no reference", pending.relevant),
        Some(reference) => format!(
            "{} path(s) since {}",
            pending.relevant,
            reference.short()
        ),
    }
}
