//! Error types for ctxforge-vcs.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from version-control queries and the
/// reference-pointer record.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The working directory is not inside a git work tree.
    #[error("not a version-controlled tree: {path}")]
    NotAVersionControlledTree { path: PathBuf },

    /// The repository exists but has no commits yet.
    #[error("repository at {path} has no commits")]
    EmptyHistory { path: PathBuf },

    /// `git` could not be spawned at all.
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    /// `git` ran and exited unsuccessfully.
    #[error("git {args} failed: {stderr}")]
    Command { args: String, stderr: String },

    /// `git` printed something we could not interpret.
    #[error("unexpected git output: {0}")]
    Parse(String),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (reference record).
    #[error("reference record JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`VcsError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> VcsError {
    VcsError::Io {
        path: path.into(),
        source,
    }
}
