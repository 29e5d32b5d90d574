//! Error types for ctxforge-sync.

use std::path::PathBuf;

use thiserror::Error;

use ctxforge_core::CoreError;
use ctxforge_renderer::GenerateError;
use ctxforge_vcs::VcsError;

/// All errors that can arise from classification and regeneration.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration, inventory or front-matter error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Version-control error (not a work tree, git failure).
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Content generation error.
    #[error("generation failed: {0}")]
    Generate(#[from] GenerateError),

    /// The artifact tree exists but cannot be read.
    #[error("artifact root {path} is unreadable: {source}")]
    ArtifactRootUnreadable {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
