//! `ctxforge update [--dry-run] [--force]`

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use ctxforge_core::CorpusState;
use ctxforge_sync::{classify, full_build, update, ClassifyOptions, RunOptions};

use super::{finish, Workspace};

/// Arguments for `ctxforge update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Decide everything but write nothing and leave the reference alone.
    #[arg(long)]
    pub dry_run: bool,

    /// Run the incremental pass even when the artifacts look up to date.
    #[arg(long)]
    pub force: bool,
}

impl UpdateArgs {
    pub async fn run(self, start: &Path) -> Result<ExitCode> {
        let workspace = Workspace::open(start).await?;
        let report = classify(
            &workspace.artifact_root(),
            &workspace.root,
            &ClassifyOptions::from_config(&workspace.config, &workspace.root),
        )
        .context("failed to inspect the artifact tree")?;
        tracing::debug!(state = %report.state, "artifact tree classified");

        let options = RunOptions {
            dry_run: self.dry_run,
        };
        let generator = workspace.generator(self.dry_run)?;

        let report = match report.state {
            CorpusState::New => {
                println!("No artifact tree yet; building everything.");
                full_build(
                    &workspace.source,
                    generator.as_ref(),
                    &workspace.root,
                    &workspace.config,
                    options,
                )
                .await
                .context("full build failed")?
            }
            CorpusState::Ready if !self.force => {
                println!("✓ Artifacts are up to date. Use --force to check for changes anyway.");
                return Ok(ExitCode::SUCCESS);
            }
            _ => update(
                &workspace.source,
                generator.as_ref(),
                &workspace.root,
                &workspace.config,
                options,
            )
            .await
            .context("update failed")?,
        };
        Ok(finish(&report))
    }
}
