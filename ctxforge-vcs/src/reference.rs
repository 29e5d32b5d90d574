//! Reference pointer: the last fully-processed revision.
//!
//! Persists a `ReferenceRecord` JSON document at
//! `<repo>/.ctxforge/state.json`:
//!
//! ```json
//! { "lastRevision": "<commit hash>", "updatedAt": "2025-01-01T00:00:00Z" }
//! ```
//!
//! Writes use an atomic `.tmp` + rename. Absence of the file is a valid state
//! meaning "never processed".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ctxforge_core::{config::state_dir, RevisionId};

use crate::error::{io_err, VcsError};

/// On-disk reference payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecord {
    pub last_revision: RevisionId,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReferenceCompat {
    Structured(ReferenceStructuredCompat),
    Bare(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceStructuredCompat {
    pub last_revision: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Path to the reference record for `repo`.
///
/// `<repo>/.ctxforge/state.json`
pub fn record_path(repo: &Path) -> PathBuf {
    state_dir(repo).join("state.json")
}

/// Load/save access to the reference record of one repository.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    path: PathBuf,
}

impl ReferenceStore {
    /// Store for `repo` at the fixed record location.
    pub fn for_repo(repo: &Path) -> Self {
        Self::at(record_path(repo))
    }

    /// Store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record. `Ok(None)` if it does not exist or is blank.
    pub fn load(&self) -> Result<Option<ReferenceRecord>, VcsError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&self.path, err)),
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let record = match serde_json::from_str::<ReferenceCompat>(&contents)? {
            ReferenceCompat::Structured(record) => ReferenceRecord {
                last_revision: RevisionId(record.last_revision),
                updated_at: record.updated_at.unwrap_or_else(Utc::now),
            },
            ReferenceCompat::Bare(revision) => ReferenceRecord {
                last_revision: RevisionId(revision),
                updated_at: Utc::now(),
            },
        };
        if record.last_revision.0.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Save `revision` atomically.
    ///
    /// Writes to `<path>.tmp` then renames to `<path>`.
    pub fn save(&self, revision: &RevisionId) -> Result<(), VcsError> {
        let Some(dir) = self.path.parent() else {
            return Err(io_err(
                &self.path,
                std::io::Error::other("invalid reference record path"),
            ));
        };
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let record = ReferenceRecord {
            last_revision: revision.clone(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }
}
