//! Error types for ctxforge-renderer.

use std::path::PathBuf;

use thiserror::Error;

use ctxforge_core::CoreError;

/// All errors that can arise while generating artifact content.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (request payloads, template context).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates or reading excerpts.
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// Front-matter rendering failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Transport-level HTTP failure (DNS, TLS, connection reset, bad body).
    #[error("http request failed: {0}")]
    Http(String),

    /// The endpoint answered with a non-success status.
    #[error("generation endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The endpoint answered without any text content.
    #[error("generation endpoint returned no text")]
    EmptyResponse,

    /// The configured API key variable is unset or blank.
    #[error("environment variable {var} is not set")]
    MissingApiKey { var: String },

    /// The blocking request task panicked or was cancelled.
    #[error("generation task failed: {0}")]
    Join(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GenerateError {
    GenerateError::Io {
        path: path.into(),
        source,
    }
}
