//! YAML front-matter carried by generated artifacts.
//!
//! ```text
//! ---
//! module: services
//! files: 2
//! last_modified: 2025-01-01T00:00:00Z
//! generated: 2025-01-02T00:00:00Z
//! status: unfilled
//! ---
//! ```

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

const FENCE: &str = "---";

/// Fill status of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// Skeleton waiting for an assistant (or the LLM generator) to fill it.
    #[default]
    Unfilled,
    Filled,
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactStatus::Unfilled => write!(f, "unfilled"),
            ArtifactStatus::Filled => write!(f, "filled"),
        }
    }
}

/// Structured header of an artifact. Every field is optional on read so
/// hand-written documents without our keys still parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ArtifactStatus>,
}

impl FrontMatter {
    pub fn is_unfilled(&self) -> bool {
        self.status == Some(ArtifactStatus::Unfilled)
    }

    /// Render as a fenced block followed by `body`.
    pub fn render(&self, body: &str) -> Result<String, CoreError> {
        let yaml = serde_yaml::to_string(self)?;
        let body = body.trim_start_matches('\n');
        Ok(format!("{FENCE}\n{yaml}{FENCE}\n\n{body}"))
    }
}

/// Split `content` into its front-matter and body.
///
/// Returns `Ok(None)` when the document does not start with a fence.
pub fn parse(content: &str) -> Result<Option<(FrontMatter, &str)>, serde_yaml::Error> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok(None);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let matter = if yaml.trim().is_empty() {
                FrontMatter::default()
            } else {
                serde_yaml::from_str(yaml)?
            };
            return Ok(Some((matter, body)));
        }
        offset += line.len();
    }
    Ok(None)
}

/// Read the front-matter of the document at `path`.
pub fn read(path: &Path) -> Result<Option<FrontMatter>, CoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse(&content)
        .map(|parsed| parsed.map(|(matter, _)| matter))
        .map_err(|e| CoreError::FrontMatter {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
