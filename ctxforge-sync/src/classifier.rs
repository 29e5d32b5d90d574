//! Corpus state classification.
//!
//! Precedence:
//! 1. `New` (`<artifact_root>/docs` missing)
//! 2. `Unfilled` (any document front-matter has `status: unfilled`)
//! 3. `Outdated` (newest source mtime beats newest artifact mtime by more
//!    than the tolerance)
//! 4. `Ready`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use ctxforge_core::{frontmatter, inventory, CorpusState, ForgeConfig, IgnoreRules};

use crate::error::SyncError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Inputs to [`classify`] beyond the two roots.
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Source newer than artifacts by at most this many seconds still counts
    /// as ready.
    pub tolerance_secs: u64,
    /// Rules for the source-tree walk (the artifact root must be covered).
    pub ignore: IgnoreRules,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            tolerance_secs: ctxforge_core::config::DEFAULT_STALE_TOLERANCE_SECS,
            ignore: IgnoreRules::default(),
        }
    }
}

impl ClassifyOptions {
    pub fn from_config(config: &ForgeConfig, repo: &Path) -> Self {
        Self {
            tolerance_secs: config.stale_tolerance_secs,
            ignore: config.ignore_rules(repo),
        }
    }
}

/// Classification plus the detail behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusReport {
    pub state: CorpusState,
    /// Markdown documents found under `docs/`.
    pub documents: usize,
    /// Documents still marked unfilled.
    pub unfilled: Vec<PathBuf>,
    pub source_newest: Option<DateTime<Utc>>,
    pub artifact_newest: Option<DateTime<Utc>>,
}

/// Classify the artifact tree at `artifact_root` against `source_root`.
///
/// # Errors
///
/// [`SyncError::ArtifactRootUnreadable`] if the artifact tree exists but
/// cannot be walked; source-tree walk failures as [`SyncError::Core`].
pub fn classify(
    artifact_root: &Path,
    source_root: &Path,
    options: &ClassifyOptions,
) -> Result<CorpusReport, SyncError> {
    let docs = artifact_root.join("docs");
    match std::fs::metadata(&docs) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(SyncError::ArtifactRootUnreadable {
                path: docs.clone(),
                source: ctxforge_core::CoreError::NotADirectory { path: docs },
            });
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Ok(CorpusReport {
                state: CorpusState::New,
                documents: 0,
                unfilled: Vec::new(),
                source_newest: None,
                artifact_newest: None,
            });
        }
        Err(err) => {
            return Err(SyncError::ArtifactRootUnreadable {
                path: docs.clone(),
                source: ctxforge_core::error::io_err(&docs, err),
            });
        }
    }

    let unreadable = |source| SyncError::ArtifactRootUnreadable {
        path: artifact_root.to_path_buf(),
        source,
    };
    let artifact_files = inventory::walk(artifact_root, &IgnoreRules::default()).map_err(unreadable)?;

    let mut documents = 0;
    let mut unfilled = Vec::new();
    for (rel, path, _) in &artifact_files {
        if !rel.starts_with("docs/") || !rel.ends_with(".md") {
            continue;
        }
        documents += 1;
        match frontmatter::read(path) {
            Ok(Some(matter)) if matter.is_unfilled() => unfilled.push(path.clone()),
            Ok(_) => {}
            Err(err) => tracing::warn!("skipping unreadable front-matter: {err}"),
        }
    }

    let artifact_newest = newest_mtime(artifact_files.iter().map(|(_, _, meta)| meta));
    let source_files = inventory::walk(source_root, &options.ignore)?;
    let source_newest = newest_mtime(source_files.iter().map(|(_, _, meta)| meta));

    let state = if !unfilled.is_empty() {
        CorpusState::Unfilled {
            count: unfilled.len(),
        }
    } else {
        match (source_newest, artifact_newest) {
            (Some(source), Some(artifact)) => {
                let delta = source.signed_duration_since(artifact).num_seconds();
                if delta > options.tolerance_secs as i64 {
                    CorpusState::Outdated {
                        days_behind: days_behind(delta),
                    }
                } else {
                    CorpusState::Ready
                }
            }
            (Some(_), None) => CorpusState::Outdated { days_behind: 1 },
            (None, _) => CorpusState::Ready,
        }
    };

    tracing::debug!(state = %state, documents, "classified artifact tree");
    Ok(CorpusReport {
        state,
        documents,
        unfilled,
        source_newest,
        artifact_newest,
    })
}

/// Whole days in `delta_secs`, rounded up, never less than one.
pub fn days_behind(delta_secs: i64) -> u64 {
    let days = (delta_secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    days.max(1) as u64
}

fn newest_mtime<'a>(metas: impl Iterator<Item = &'a std::fs::Metadata>) -> Option<DateTime<Utc>> {
    metas
        .filter_map(|meta| meta.modified().ok())
        .map(DateTime::<Utc>::from)
        .max()
}

/// Format the age of `timestamp` as `42s`, `5m`, `3h` or `2d`.
pub fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
