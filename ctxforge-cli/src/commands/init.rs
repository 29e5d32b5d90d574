//! `ctxforge init [--generator template|llm] [--force]`

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use ctxforge_core::{config, CorpusState};
use ctxforge_sync::{classify, full_build, ClassifyOptions, RunOptions};

use super::{finish, Workspace};
use crate::GeneratorKindArg;

/// Write the repository configuration and build the artifact tree.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Content generator: template | llm.
    #[arg(long, value_name = "KIND")]
    pub generator: Option<GeneratorKindArg>,

    /// Overwrite an existing configuration and rebuild an existing tree.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub async fn run(self, start: &Path) -> Result<ExitCode> {
        let mut workspace = Workspace::open(start).await?;
        if let Some(kind) = self.generator {
            workspace.config.generator.kind = kind.into();
        }

        // Nothing is written until the artifact tree and generator check out.
        let artifact_root = workspace.artifact_root();
        let existing = classify(
            &artifact_root,
            &workspace.root,
            &ClassifyOptions::from_config(&workspace.config, &workspace.root),
        )
        .context("failed to inspect the artifact tree")?;
        let rebuild = existing.state == CorpusState::New || self.force;
        let generator = if rebuild {
            Some(workspace.generator(false)?)
        } else {
            None
        };

        let config_path = config::repo_config_path(&workspace.root);
        if self.force {
            config::save_at(&workspace.root, &workspace.config)
                .with_context(|| format!("failed to write '{}'", config_path.display()))?;
            println!("✓ Wrote {}", config_path.display());
        } else if config::write_default_at(&workspace.root, &workspace.config)
            .with_context(|| format!("failed to write '{}'", config_path.display()))?
        {
            println!("✓ Wrote {}", config_path.display());
        } else {
            println!("· Kept existing {}", config_path.display());
        }

        let Some(generator) = generator else {
            println!(
                "Artifacts already exist at {} ({}). Run `ctxforge update`, or `ctxforge init --force` to rebuild.",
                artifact_root.display(),
                existing.state
            );
            return Ok(ExitCode::SUCCESS);
        };

        let report = full_build(
            &workspace.source,
            generator.as_ref(),
            &workspace.root,
            &workspace.config,
            RunOptions::default(),
        )
        .await
        .context("initial build failed")?;
        Ok(finish(&report))
    }
}
