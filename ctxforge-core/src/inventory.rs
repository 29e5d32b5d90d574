//! Repository file inventory.
//!
//! Walks the repository, skipping ignored directories, and records every file
//! with its size, modification time, and a text/binary classification. The
//! inventory is rebuilt on every invocation and feeds module grouping.

use std::fs::Metadata;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{io_err, CoreError};

/// Directory names that are never part of the analysed source.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".ctxforge",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "coverage",
    "vendor",
    ".venv",
    "venv",
    "__pycache__",
    ".next",
    ".idea",
    ".vscode",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "pdf", "zip", "gz", "tgz", "bz2", "xz",
    "7z", "tar", "jar", "class", "exe", "dll", "so", "dylib", "a", "o", "obj", "wasm", "woff",
    "woff2", "ttf", "otf", "eot", "mp3", "mp4", "mov", "avi", "wav", "flac", "sqlite", "db",
    "bin", "lock",
];

const SNIFF_BYTES: usize = 8 * 1024;

/// Text or binary, as far as documentation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Text,
    Binary,
}

/// A single inventoried file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Repository-relative, POSIX-style path.
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub kind: FileKind,
}

/// Path-prefix based ignore rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRules {
    dir_names: Vec<String>,
    prefixes: Vec<String>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            dir_names: DEFAULT_IGNORED_DIRS.iter().map(|s| (*s).to_string()).collect(),
            prefixes: Vec::new(),
        }
    }
}

impl IgnoreRules {
    /// Default rules plus extra repository-relative prefixes.
    pub fn with_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Self::default();
        for prefix in prefixes {
            rules.add_prefix(prefix.as_ref());
        }
        rules
    }

    pub fn add_prefix(&mut self, prefix: &str) {
        let normalized = prefix
            .replace('\\', "/")
            .trim_start_matches("./")
            .trim_matches('/')
            .to_string();
        if !normalized.is_empty() && !self.prefixes.contains(&normalized) {
            self.prefixes.push(normalized);
        }
    }

    /// `true` if the directory at `dir` (repository-relative) is skipped
    /// entirely: one of its components is an ignored name or it sits under
    /// an ignored prefix.
    pub fn is_ignored_dir(&self, dir: &str) -> bool {
        let dir = dir.trim_start_matches("./").trim_end_matches('/');
        if dir
            .split('/')
            .any(|segment| self.dir_names.iter().any(|name| name == segment))
        {
            return true;
        }
        self.matches_prefix(dir)
    }

    /// `true` if any directory component is ignored or the path falls under
    /// an ignored prefix.
    pub fn is_ignored(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./");
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop();
        if segments
            .iter()
            .any(|segment| self.dir_names.iter().any(|name| name == segment))
        {
            return true;
        }
        self.matches_prefix(path)
    }

    fn matches_prefix(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// `true` when the extension alone marks `path` as binary.
pub fn is_binary_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            BINARY_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Every non-ignored file under `root`, as `(relative_path, path, metadata)`,
/// sorted by path. Symlinks are not followed.
pub fn walk(root: &Path, rules: &IgnoreRules) -> Result<Vec<(String, PathBuf, Metadata)>, CoreError> {
    let meta = std::fs::metadata(root).map_err(|e| io_err(root, e))?;
    if !meta.is_dir() {
        return Err(CoreError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !rules.is_ignored_dir(&relative_posix(root, e.path()))
        });

    let mut out = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| walk_err(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative_posix(root, entry.path());
        if rules.is_ignored(&rel) {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => out.push((rel, entry.into_path(), meta)),
            // Raced with a deletion.
            Err(err) if err.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => {}
            Err(err) => return Err(walk_err(root, err)),
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

fn walk_err(root: &Path, err: walkdir::Error) -> CoreError {
    CoreError::Walk {
        path: err.path().unwrap_or(root).to_path_buf(),
        source: err,
    }
}

fn relative_posix(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn sniff_kind(path: &Path, rel: &str) -> Result<FileKind, CoreError> {
    if is_binary_extension(rel) {
        return Ok(FileKind::Binary);
    }
    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => return Ok(FileKind::Binary),
        Err(err) => return Err(io_err(path, err)),
    };
    let mut buf = vec![0u8; SNIFF_BYTES];
    let read = file.read(&mut buf).map_err(|e| io_err(path, e))?;
    if buf[..read].contains(&0) {
        Ok(FileKind::Binary)
    } else {
        Ok(FileKind::Text)
    }
}

/// Snapshot of the repository's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub root: PathBuf,
    pub files: Vec<FileEntry>,
}

impl Inventory {
    /// Build an inventory from already-known entries (tests, synthetic input).
    pub fn from_entries(root: impl Into<PathBuf>, mut files: Vec<FileEntry>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        Self {
            root: root.into(),
            files,
        }
    }

    /// Scan `root` honouring `rules`.
    pub fn scan(root: &Path, rules: &IgnoreRules) -> Result<Self, CoreError> {
        let mut files = Vec::new();
        for (rel, path, meta) in walk(root, rules)? {
            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            files.push(FileEntry {
                kind: sniff_kind(&path, &rel)?,
                path: rel,
                size: meta.len(),
                modified,
            });
        }
        tracing::debug!(root = %root.display(), files = files.len(), "inventory scanned");
        Ok(Self::from_entries(root, files))
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.files
            .binary_search_by(|entry| entry.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.files[idx])
    }

    pub fn is_text(&self, path: &str) -> bool {
        matches!(self.get(path), Some(entry) if entry.kind == FileKind::Text)
    }

    /// Keep only the paths in `keep` (e.g. tracked files).
    pub fn retain_paths<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.files.retain(|entry| keep(&entry.path));
    }

    pub fn text_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|entry| entry.kind == FileKind::Text)
    }

    /// Most recent modification time among `paths`.
    pub fn newest_of<'a, I>(&self, paths: I) -> Option<DateTime<Utc>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        paths
            .into_iter()
            .filter_map(|path| self.get(path))
            .map(|entry| entry.modified)
            .max()
    }
}
