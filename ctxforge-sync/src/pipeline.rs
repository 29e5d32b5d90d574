//! Pipeline entrypoints used by the CLI: incremental update, full build
//! and the pending-change summary behind `status`.

use std::path::Path;

use ctxforge_core::{ChangeSet, ForgeConfig, Inventory, RevisionId};
use ctxforge_renderer::ContentGenerator;
use ctxforge_vcs::{BaseRevision, ChangeSource, Changes};

use crate::error::SyncError;
use crate::orchestrator::{filter_changes, Orchestrator, RunOptions, RunReport};

/// Result of [`update`] or [`full_build`].
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub head: RevisionId,
    pub base: BaseRevision,
    /// Reference that was discarded because it no longer exists.
    pub stale_reference: Option<RevisionId>,
    pub run: RunReport,
}

/// Changes waiting to be processed, for `status`.
#[derive(Debug, Clone)]
pub struct Pending {
    pub reference: Option<RevisionId>,
    pub head: RevisionId,
    pub base: BaseRevision,
    /// Raw change entries between base and head.
    pub raw: usize,
    /// Entries left after filtering.
    pub relevant: usize,
}

/// Scan the repository and keep only tracked files.
pub async fn load_inventory(
    source: &dyn ChangeSource,
    repo: &Path,
    config: &ForgeConfig,
) -> Result<Inventory, SyncError> {
    let mut inventory = Inventory::scan(repo, &config.ignore_rules(repo))?;
    let tracked = source.tracked_files().await?;
    inventory.retain_paths(|path| tracked.contains(path));
    tracing::debug!(files = inventory.files.len(), "inventory loaded");
    Ok(inventory)
}

/// Regenerate what changed since the reference pointer.
pub async fn update(
    source: &dyn ChangeSource,
    generator: &dyn ContentGenerator,
    repo: &Path,
    config: &ForgeConfig,
    options: RunOptions,
) -> Result<UpdateReport, SyncError> {
    let reference = source.load_reference();
    let changes = source.changes_since(reference.as_ref()).await?;
    let inventory = load_inventory(source, repo, config).await?;
    run(source, generator, repo, config, options, changes, &inventory).await
}

/// Regenerate everything: every tracked file is treated as added.
pub async fn full_build(
    source: &dyn ChangeSource,
    generator: &dyn ContentGenerator,
    repo: &Path,
    config: &ForgeConfig,
    options: RunOptions,
) -> Result<UpdateReport, SyncError> {
    let head = source.current_revision().await?;
    let inventory = load_inventory(source, repo, config).await?;
    let changes = Changes {
        set: ChangeSet::all_added(inventory.files.iter().map(|f| f.path.clone())),
        head,
        base: BaseRevision::Root,
        stale_reference: None,
    };
    run(source, generator, repo, config, options, changes, &inventory).await
}

/// `update` with writes and the pointer advance suppressed.
pub async fn preview(
    source: &dyn ChangeSource,
    generator: &dyn ContentGenerator,
    repo: &Path,
    config: &ForgeConfig,
) -> Result<UpdateReport, SyncError> {
    update(source, generator, repo, config, RunOptions { dry_run: true }).await
}

/// Summarise what an `update` would look at, without generating anything.
pub async fn pending(
    source: &dyn ChangeSource,
    repo: &Path,
    config: &ForgeConfig,
) -> Result<Pending, SyncError> {
    let reference = source.load_reference();
    let changes = source.changes_since(reference.as_ref()).await?;
    let inventory = load_inventory(source, repo, config).await?;
    let relevant = filter_changes(&changes.set, &inventory, &config.ignore_rules(repo)).len();
    Ok(Pending {
        reference,
        head: changes.head,
        base: changes.base,
        raw: changes.set.len(),
        relevant,
    })
}

async fn run(
    source: &dyn ChangeSource,
    generator: &dyn ContentGenerator,
    repo: &Path,
    config: &ForgeConfig,
    options: RunOptions,
    changes: Changes,
    inventory: &Inventory,
) -> Result<UpdateReport, SyncError> {
    let mut orchestrator = Orchestrator::for_repo(source, generator, repo, config, options);
    let report = orchestrator.run(&changes.set, inventory).await?;
    Ok(UpdateReport {
        head: changes.head,
        base: changes.base,
        stale_reference: changes.stale_reference,
        run: report,
    })
}
