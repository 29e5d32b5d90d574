//! Artifact tree layout.
//!
//! ```text
//! <artifact_root>/
//!   docs/
//!     README.md          (index)
//!     overview.md
//!     modules/
//!       <slug>.md        (one per module)
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, CoreError};
use crate::types::ModuleName;

/// Resolves artifact paths under a single artifact root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.root.join("docs")
    }

    pub fn index_path(&self) -> PathBuf {
        self.docs_dir().join("README.md")
    }

    pub fn overview_path(&self) -> PathBuf {
        self.docs_dir().join("overview.md")
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.docs_dir().join("modules")
    }

    pub fn module_path(&self, module: &ModuleName) -> PathBuf {
        self.modules_dir().join(format!("{}.md", module.slug()))
    }

    /// `path` relative to the artifact root, POSIX-style, for reporting.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Existing module artifacts as `(slug, path)`, sorted by slug.
    ///
    /// A missing `modules/` directory is an empty listing.
    pub fn module_artifacts(&self) -> Result<Vec<(String, PathBuf)>, CoreError> {
        let dir = self.modules_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_err(&dir, err)),
        };

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let path = entry.path();
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file || path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            artifacts.push((stem.to_string(), path.clone()));
        }
        artifacts.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_follow_layout() {
        let layout = ArtifactLayout::new("/repo/.context");
        assert_eq!(layout.index_path(), PathBuf::from("/repo/.context/docs/README.md"));
        assert_eq!(
            layout.overview_path(),
            PathBuf::from("/repo/.context/docs/overview.md")
        );
        assert_eq!(
            layout.module_path(&ModuleName::from("src/api")),
            PathBuf::from("/repo/.context/docs/modules/src-api.md")
        );
    }

    #[test]
    fn relative_is_posix() {
        let layout = ArtifactLayout::new("/repo/.context");
        let path = layout.module_path(&ModuleName::from("services"));
        assert_eq!(layout.relative(&path), "docs/modules/services.md");
    }

    #[test]
    fn module_artifacts_lists_markdown_only() {
        let tmp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        assert!(layout.module_artifacts().unwrap().is_empty());

        std::fs::create_dir_all(layout.modules_dir()).unwrap();
        std::fs::write(layout.modules_dir().join("services.md"), "x").unwrap();
        std::fs::write(layout.modules_dir().join("api.md"), "x").unwrap();
        std::fs::write(layout.modules_dir().join("notes.txt"), "x").unwrap();

        let slugs: Vec<_> = layout
            .module_artifacts()
            .unwrap()
            .into_iter()
            .map(|(slug, _)| slug)
            .collect();
        assert_eq!(slugs, ["api", "services"]);
    }
}
