//! `ctxforge preview`: `update --dry-run` regardless of artifact state.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use ctxforge_sync::preview;

use super::{finish, Workspace};

#[derive(Args, Debug)]
pub struct PreviewArgs {}

impl PreviewArgs {
    pub async fn run(self, start: &Path) -> Result<ExitCode> {
        let workspace = Workspace::open(start).await?;
        let generator = workspace.generator(true)?;
        let report = preview(
            &workspace.source,
            generator.as_ref(),
            &workspace.root,
            &workspace.config,
        )
        .await
        .context("preview failed")?;
        Ok(finish(&report))
    }
}
