//! Incremental regeneration.
//!
//! One [`Orchestrator::run`] walks the stage machine
//!
//! ```text
//! Idle -> Filtering -> PerModuleRegeneration -> OrphanCleanup
//!      -> ConditionalOverviewRegeneration -> PointerAdvance -> Idle
//! ```
//!
//! Module regeneration is serial and continue-on-error: every module yields
//! a tagged result and the pointer-advance decision is taken from the
//! aggregate. The pointer is held back when every attempted module failed
//! or when the overview or index could not be regenerated, so the next run
//! sees the same changes again.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use ctxforge_core::{
    inventory::is_binary_extension,
    modules::{group_modules, slug_clashes}, ArtifactLayout, ChangeSet,
    ForgeConfig, IgnoreRules, Inventory, Module, ModuleFailure, RegenerationResult, RenamedPath,
};
use ctxforge_renderer::ContentGenerator;
use ctxforge_vcs::ChangeSource;

use crate::analyzer::{analyze, Analysis};
use crate::error::SyncError;
use crate::writer::{atomic_write, remove_artifact, WriteResult};

/// Failure label used for the overview document.
pub const OVERVIEW_LABEL: &str = "overview";
/// Failure label used for the index document.
pub const INDEX_LABEL: &str = "index";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Filtering,
    PerModuleRegeneration,
    OrphanCleanup,
    ConditionalOverviewRegeneration,
    PointerAdvance,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Filtering => "filtering",
            Stage::PerModuleRegeneration => "per-module-regeneration",
            Stage::OrphanCleanup => "orphan-cleanup",
            Stage::ConditionalOverviewRegeneration => "overview-regeneration",
            Stage::PointerAdvance => "pointer-advance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Decide everything, write nothing, leave the pointer alone.
    pub dry_run: bool,
}

/// Everything one run decided and did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// The change set after filtering.
    pub filtered: ChangeSet,
    pub analysis: Analysis,
    pub result: RegenerationResult,
    /// At least one module generation was attempted and none succeeded.
    pub all_failed: bool,
}

/// Drives one regeneration pass over an artifact tree.
pub struct Orchestrator<'a> {
    source: &'a dyn ChangeSource,
    generator: &'a dyn ContentGenerator,
    layout: ArtifactLayout,
    ignore: IgnoreRules,
    source_roots: Vec<String>,
    options: RunOptions,
    stage: Stage,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        source: &'a dyn ChangeSource,
        generator: &'a dyn ContentGenerator,
        layout: ArtifactLayout,
        ignore: IgnoreRules,
        source_roots: Vec<String>,
        options: RunOptions,
    ) -> Self {
        Self {
            source,
            generator,
            layout,
            ignore,
            source_roots,
            options,
            stage: Stage::Idle,
        }
    }

    /// Orchestrator for `repo` with layout, ignore rules and source roots
    /// taken from `config`.
    pub fn for_repo(
        source: &'a dyn ChangeSource,
        generator: &'a dyn ContentGenerator,
        repo: &Path,
        config: &ForgeConfig,
        options: RunOptions,
    ) -> Self {
        Self::new(
            source,
            generator,
            ArtifactLayout::new(config.artifact_root_in(repo)),
            config.ignore_rules(repo),
            config.source_roots.clone(),
            options,
        )
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "stage transition");
        self.stage = stage;
    }

    /// Regenerate what `changes` affects. `inventory` must already be
    /// restricted to tracked files.
    ///
    /// Per-module failures are reported in `result.failures`; only
    /// environment errors (an unreadable artifact tree) are returned as `Err`.
    pub async fn run(
        &mut self,
        changes: &ChangeSet,
        inventory: &Inventory,
    ) -> Result<RunReport, SyncError> {
        let outcome = self.run_stages(changes, inventory).await;
        self.enter(Stage::Idle);
        outcome
    }

    async fn run_stages(
        &mut self,
        changes: &ChangeSet,
        inventory: &Inventory,
    ) -> Result<RunReport, SyncError> {
        let dry_run = self.options.dry_run;
        let mut result = RegenerationResult {
            dry_run,
            ..RegenerationResult::default()
        };

        self.enter(Stage::Filtering);
        let filtered = self.filter(changes, inventory);
        tracing::debug!(
            raw = changes.len(),
            kept = filtered.len(),
            "filtered change set"
        );

        let modules = group_modules(
            inventory.text_files().map(|f| f.path.as_str()),
            &self.source_roots,
        );
        let analysis = analyze(&filtered, &modules, &self.source_roots);
        let clashes = slug_clashes(&modules);

        if filtered.is_empty() {
            tracing::info!("no relevant changes");
            self.enter(Stage::PointerAdvance);
            result.pointer_advanced = self.advance_pointer(false).await;
            return Ok(RunReport {
                filtered,
                analysis,
                result,
                all_failed: false,
            });
        }

        // Per-module regeneration: tagged results, never fail-fast.
        self.enter(Stage::PerModuleRegeneration);
        let mut attempted = 0usize;
        let mut succeeded = 0usize;
        for impact in &analysis.affected_modules {
            let Some(module) = modules.iter().find(|m| m.name == impact.module) else {
                tracing::debug!(module = %impact.module, "module no longer exists; left to orphan cleanup");
                continue;
            };
            if let Some(owner) = clashes.get(&module.name) {
                tracing::warn!(module = %module.name, owner = %owner, "artifact slug already taken");
                result.failures.push(ModuleFailure {
                    module: module.name.0.clone(),
                    message: format!(
                        "artifact {} already belongs to module '{owner}'",
                        self.layout.module_path(&module.name).display()
                    ),
                });
                continue;
            }
            attempted += 1;
            match self.regenerate_module(module, inventory).await {
                Ok(write) => {
                    succeeded += 1;
                    record(&mut result, &self.layout, &write);
                }
                Err(err) => {
                    tracing::warn!(module = %module.name, "module regeneration failed: {err}");
                    result.failures.push(ModuleFailure {
                        module: module.name.0.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        self.enter(Stage::OrphanCleanup);
        let current: BTreeSet<String> = modules.iter().map(Module::slug).collect();
        for (slug, path) in self.layout.module_artifacts()? {
            if current.contains(&slug) {
                continue;
            }
            match remove_artifact(&path, dry_run) {
                Ok(write) => record(&mut result, &self.layout, &write),
                Err(err) => {
                    tracing::warn!(path = %path.display(), "failed to remove orphaned artifact: {err}");
                    result.failures.push(ModuleFailure {
                        module: slug,
                        message: err.to_string(),
                    });
                }
            }
        }

        let mut overview_failed = false;
        if analysis.overview_needed || succeeded > 0 || result.updated > 0 || result.removed > 0 {
            self.enter(Stage::ConditionalOverviewRegeneration);
            let documented: Vec<Module> = modules
                .iter()
                .filter(|m| !clashes.contains_key(&m.name))
                .cloned()
                .collect();
            result.overview_updated = self
                .regenerate_overview(&documented, inventory, &mut result)
                .await;
            overview_failed = !result.overview_updated;
        }

        self.enter(Stage::PointerAdvance);
        let all_failed = attempted > 0 && succeeded == 0;
        if all_failed {
            tracing::warn!(attempted, "every module regeneration failed; reference pointer not advanced");
        }
        if overview_failed {
            tracing::warn!("overview regeneration failed; reference pointer not advanced");
        }
        result.pointer_advanced = self.advance_pointer(all_failed || overview_failed).await;

        Ok(RunReport {
            filtered,
            analysis,
            result,
            all_failed,
        })
    }

    /// See [`filter_changes`].
    pub fn filter(&self, changes: &ChangeSet, inventory: &Inventory) -> ChangeSet {
        filter_changes(changes, inventory, &self.ignore)
    }

    async fn regenerate_module(
        &self,
        module: &Module,
        inventory: &Inventory,
    ) -> Result<WriteResult, SyncError> {
        let path = self.layout.module_path(&module.name);
        if self.options.dry_run {
            return Ok(WriteResult::WouldWrite { path });
        }
        let body = self.generator.generate_module(module, inventory).await?;
        atomic_write(&path, body.as_str())
    }

    /// Regenerate overview and index. Returns `true` when both were written
    /// (or would be, in dry-run).
    async fn regenerate_overview(
        &self,
        modules: &[Module],
        inventory: &Inventory,
        result: &mut RegenerationResult,
    ) -> bool {
        let overview_path = self.layout.overview_path();
        let index_path = self.layout.index_path();
        if self.options.dry_run {
            for path in [overview_path, index_path] {
                record(result, &self.layout, &WriteResult::WouldWrite { path });
            }
            return true;
        }

        let overview = match self.generator.generate_overview(modules, inventory).await {
            Ok(body) => atomic_write(&overview_path, body.as_str()),
            Err(err) => Err(err.into()),
        };
        let index = match self.generator.render_index(modules, inventory) {
            Ok(content) => atomic_write(&index_path, &content),
            Err(err) => Err(err.into()),
        };

        let mut ok = true;
        for (label, outcome) in [(OVERVIEW_LABEL, overview), (INDEX_LABEL, index)] {
            match outcome {
                Ok(write) => record(result, &self.layout, &write),
                Err(err) => {
                    ok = false;
                    tracing::warn!("{label} regeneration failed: {err}");
                    result.failures.push(ModuleFailure {
                        module: label.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
        ok
    }

    /// Persist the current revision. Failures are logged and reported as
    /// `false`; a lost pointer only widens the next run.
    async fn advance_pointer(&self, blocked: bool) -> bool {
        if self.options.dry_run {
            tracing::debug!("dry-run: reference pointer left untouched");
            return false;
        }
        if blocked {
            return false;
        }
        let head = match self.source.current_revision().await {
            Ok(head) => head,
            Err(err) => {
                tracing::warn!("could not resolve current revision; pointer not advanced: {err}");
                return false;
            }
        };
        match self.source.persist_reference(&head) {
            Ok(()) => {
                tracing::debug!(revision = %head.short(), "reference pointer advanced");
                true
            }
            Err(err) => {
                tracing::warn!("failed to persist reference pointer: {err}");
                false
            }
        }
    }
}

/// Keep only paths that matter for documentation.
///
/// Present-side paths (added, modified, rename targets) must be tracked
/// text files. Gone-side paths (deleted, rename sources) must not be
/// ignored nor binary by extension. A rename with only one usable side
/// degrades to an addition or a deletion.
pub fn filter_changes(changes: &ChangeSet, inventory: &Inventory, ignore: &IgnoreRules) -> ChangeSet {
    let present = |path: &str| !ignore.is_ignored(path) && inventory.is_text(path);
    let gone = |path: &str| !ignore.is_ignored(path) && !is_binary_extension(path);

    let mut out = ChangeSet {
        added: changes.added.iter().filter(|p| present(p.as_str())).cloned().collect(),
        modified: changes.modified.iter().filter(|p| present(p.as_str())).cloned().collect(),
        deleted: changes.deleted.iter().filter(|p| gone(p.as_str())).cloned().collect(),
        renamed: Vec::new(),
    };
    for RenamedPath { from, to } in &changes.renamed {
        match (gone(from), present(to)) {
            (true, true) => out.renamed.push(RenamedPath {
                from: from.clone(),
                to: to.clone(),
            }),
            (false, true) => push_unique(&mut out.added, to),
            (true, false) => push_unique(&mut out.deleted, from),
            (false, false) => {}
        }
    }
    out
}

fn push_unique(paths: &mut Vec<String>, path: &str) {
    if !paths.iter().any(|p| p == path) {
        paths.push(path.to_string());
    }
}

fn record(result: &mut RegenerationResult, layout: &ArtifactLayout, write: &WriteResult) {
    let rel = layout.relative(write.path());
    if write.is_update() {
        result.updated += 1;
        result.updated_paths.push(rel);
    } else if write.is_removal() {
        result.removed += 1;
        result.removed_paths.push(rel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use ctxforge_core::{FileEntry, FileKind, RevisionId};
    use ctxforge_renderer::{TemplateEngine, TemplateGenerator};
    use ctxforge_vcs::{Changes, VcsError, VcsFuture};

    struct NoSource;

    impl ChangeSource for NoSource {
        fn current_revision(&self) -> VcsFuture<'_, RevisionId> {
            Box::pin(async { Ok(RevisionId::from("head")) })
        }
        fn changes_since<'a>(&'a self, _: Option<&'a RevisionId>) -> VcsFuture<'a, Changes> {
            Box::pin(async { Err(VcsError::Parse("unused".to_string())) })
        }
        fn tracked_files(&self) -> VcsFuture<'_, BTreeSet<String>> {
            Box::pin(async { Ok(BTreeSet::new()) })
        }
        fn load_reference(&self) -> Option<RevisionId> {
            None
        }
        fn persist_reference(&self, _: &RevisionId) -> Result<(), VcsError> {
            Ok(())
        }
    }

    fn inventory() -> Inventory {
        let entry = |path: &str, kind| FileEntry {
            path: path.to_string(),
            size: 1,
            modified: chrono::Utc::now(),
            kind,
        };
        Inventory::from_entries(
            PathBuf::from("/repo"),
            vec![
                entry("src/api/a.rs", FileKind::Text),
                entry("assets/logo.svg", FileKind::Binary),
            ],
        )
    }

    fn owned(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn filter_drops_untracked_binary_and_artifacts() {
        let generator = TemplateGenerator::new(TemplateEngine::new(None).unwrap());
        let config = ForgeConfig::default();
        let orch = Orchestrator::for_repo(
            &NoSource,
            &generator,
            Path::new("/repo"),
            &config,
            RunOptions::default(),
        );
        let changes = ChangeSet {
            added: owned(&["src/api/a.rs", "scratch.rs", "assets/logo.svg"]),
            modified: owned(&[".context/docs/overview.md", ".ctxforge/state.json"]),
            deleted: owned(&["old/gone.rs", "old/pic.png", "node_modules/x/index.js"]),
            renamed: vec![
                RenamedPath {
                    from: "img/a.png".to_string(),
                    to: "src/api/a.rs".to_string(),
                },
                RenamedPath {
                    from: "src/api/b.rs".to_string(),
                    to: "untracked/b.rs".to_string(),
                },
            ],
        };
        let filtered = orch.filter(&changes, &inventory());
        assert_eq!(filtered.added, ["src/api/a.rs"]);
        assert!(filtered.modified.is_empty());
        assert_eq!(filtered.deleted, ["old/gone.rs", "src/api/b.rs"]);
        assert!(filtered.renamed.is_empty());
    }

    #[test]
    fn stage_names_are_kebab_case() {
        assert_eq!(Stage::PerModuleRegeneration.to_string(), "per-module-regeneration");
        assert_eq!(Stage::Idle.to_string(), "idle");
    }
}
