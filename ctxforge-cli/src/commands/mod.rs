//! Subcommand implementations.

pub mod init;
pub mod preview;
pub mod status;
pub mod update;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use ctxforge_core::{config, ForgeConfig, ImpactLevel, RegenerationResult};
use ctxforge_renderer::{ContentGenerator, TemplateGenerator};
use ctxforge_sync::{Analysis, UpdateReport};
use ctxforge_vcs::{BaseRevision, GitChangeSource};

/// The repository a command operates on.
pub struct Workspace {
    pub root: PathBuf,
    pub config: ForgeConfig,
    pub source: GitChangeSource,
}

impl Workspace {
    /// Locate the work tree containing `start` and load its configuration.
    pub async fn open(start: &Path) -> Result<Self> {
        let source = GitChangeSource::discover(start)
            .await
            .with_context(|| format!("'{}' is not inside a git work tree", start.display()))?;
        let root = source.root().to_path_buf();
        let config = config::load(&root)
            .with_context(|| format!("failed to load configuration for '{}'", root.display()))?;
        Ok(Self {
            root,
            config,
            source,
        })
    }

    pub fn artifact_root(&self) -> PathBuf {
        self.config.artifact_root_in(&self.root)
    }

    /// The configured generator. Dry runs never generate, so they get the
    /// template generator and need no API key.
    pub fn generator(&self, dry_run: bool) -> Result<Box<dyn ContentGenerator>> {
        if dry_run {
            let templates = TemplateGenerator::for_repo(&self.root)
                .context("failed to load templates")?;
            return Ok(Box::new(templates));
        }
        ctxforge_renderer::from_config(&self.config, &self.root)
            .context("failed to set up the content generator")
    }
}

// ---------------------------------------------------------------------------
// Shared output
// ---------------------------------------------------------------------------

pub fn describe_base(base: &BaseRevision) -> String {
    match base {
        BaseRevision::Reference(rev) => format!("since {}", rev.short()),
        BaseRevision::Parent(rev) => format!("since {} (previous revision)", rev.short()),
        BaseRevision::Root => "full tree".to_string(),
    }
}

pub fn print_analysis(analysis: &Analysis) {
    if analysis.is_empty() {
        return;
    }
    println!(
        "{} module(s) affected, estimated {}{}",
        analysis.affected_modules.len(),
        analysis.cost,
        if analysis.overview_needed {
            ", overview needed"
        } else {
            ""
        }
    );
    for impact in &analysis.affected_modules {
        println!(
            "  {} {} ({} file{})",
            impact_label(impact.impact),
            impact.module,
            impact.affected_files.len(),
            if impact.affected_files.len() == 1 { "" } else { "s" }
        );
    }
    for line in &analysis.recommendations {
        println!("  {} {line}", "›".bright_black());
    }
}

fn impact_label(level: ImpactLevel) -> String {
    let text = format!("{:<6}", level.to_string());
    match level {
        ImpactLevel::High => text.red().bold().to_string(),
        ImpactLevel::Medium => text.yellow().to_string(),
        ImpactLevel::Low => text.green().to_string(),
    }
}

pub fn print_result(result: &RegenerationResult) {
    let prefix = if result.dry_run { "[dry-run] " } else { "" };

    if result.updated == 0 && result.removed == 0 && result.failures.is_empty() {
        println!("{prefix}✓ nothing to do");
    } else {
        println!(
            "{prefix}✓ {} written, {} removed",
            result.updated, result.removed
        );
    }

    let (write_mark, remove_mark) = if result.dry_run {
        ("~", "-")
    } else {
        ("✎", "✗")
    };
    for path in &result.updated_paths {
        println!("  {write_mark}  {path}");
    }
    for path in &result.removed_paths {
        println!("  {remove_mark}  {path}");
    }

    for failure in &result.failures {
        eprintln!(
            "{} {}: {}",
            "warning:".yellow().bold(),
            failure.module,
            failure.message
        );
    }
}

/// Print a full update report and pick the exit code.
pub fn finish(report: &UpdateReport) -> std::process::ExitCode {
    if let Some(stale) = &report.stale_reference {
        eprintln!(
            "{} reference {} no longer exists; compared against the previous revision",
            "warning:".yellow().bold(),
            stale.short()
        );
    }
    println!("{} → {}", describe_base(&report.base), report.head.short());
    print_analysis(&report.run.analysis);
    print_result(&report.run.result);

    if report.run.all_failed {
        eprintln!(
            "{} every module failed to regenerate; reference not advanced",
            "error:".red().bold()
        );
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
