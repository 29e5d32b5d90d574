//! Domain types shared by every ctxforge crate.
//!
//! Paths inside change sets and inventories are repository-relative,
//! POSIX-style `String`s (they come from git, not from the local filesystem).
//! Filesystem locations use `PathBuf`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// An opaque revision identifier from the version-control history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionId(pub String);

impl RevisionId {
    /// Abbreviated form for display (first 8 characters).
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RevisionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RevisionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The grouping key of a logical module (`generators`, `src/services`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleName(pub String);

impl ModuleName {
    /// File-name slug of the module's artifact: lowercase, with whitespace
    /// and path separators turned into hyphens.
    pub fn slug(&self) -> String {
        self.0
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '-' } else { c })
            .collect()
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Change set
// ---------------------------------------------------------------------------

/// A single rename reported by the change source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenamedPath {
    pub from: String,
    pub to: String,
}

/// Typed set of changes relative to a reference revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub renamed: Vec<RenamedPath>,
}

impl ChangeSet {
    /// A change set reporting every given path as newly added.
    pub fn all_added<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            added: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty()
    }

    /// Number of change entries (a rename counts once).
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len() + self.renamed.len()
    }

    /// `true` when files appeared or disappeared.
    pub fn has_structural_change(&self) -> bool {
        !self.added.is_empty() || !self.deleted.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Modules and impact
// ---------------------------------------------------------------------------

/// A logical grouping of files, recomputed from the inventory on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: ModuleName,
    pub description: String,
    pub files: Vec<String>,
}

impl Module {
    pub fn slug(&self) -> String {
        self.name.slug()
    }
}

/// Coarse classification of how strongly a module was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    /// Affected-file count at which a module becomes `High` on volume alone.
    pub const HIGH_FILE_THRESHOLD: usize = 5;
    /// Affected-file count at which a module becomes `Medium`.
    pub const MEDIUM_FILE_THRESHOLD: usize = 2;

    /// Classify from the affected-file count and the presence of
    /// deletions or renames.
    pub fn classify(affected_files: usize, has_deletion: bool, has_rename: bool) -> Self {
        if has_deletion || has_rename || affected_files >= Self::HIGH_FILE_THRESHOLD {
            ImpactLevel::High
        } else if affected_files >= Self::MEDIUM_FILE_THRESHOLD {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactLevel::Low => write!(f, "low"),
            ImpactLevel::Medium => write!(f, "medium"),
            ImpactLevel::High => write!(f, "high"),
        }
    }
}

/// Per-module view of a change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleImpact {
    pub module: ModuleName,
    pub description: String,
    pub affected_files: Vec<String>,
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<RenamedPath>,
    pub impact: ImpactLevel,
}

impl ModuleImpact {
    pub fn new(module: ModuleName, description: impl Into<String>) -> Self {
        Self {
            module,
            description: description.into(),
            affected_files: Vec::new(),
            added: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
            renamed: Vec::new(),
            impact: ImpactLevel::Low,
        }
    }

    /// Recompute `impact` from the current buckets.
    pub fn reclassify(&mut self) {
        self.impact = ImpactLevel::classify(
            self.affected_files.len(),
            !self.deleted.is_empty(),
            !self.renamed.is_empty(),
        );
    }
}

// ---------------------------------------------------------------------------
// Corpus state
// ---------------------------------------------------------------------------

/// Freshness of the generated artifact tree relative to the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CorpusState {
    /// No artifact tree exists yet.
    New,
    /// Some artifacts still carry the `unfilled` marker.
    Unfilled { count: usize },
    /// Source files are newer than the newest artifact.
    Outdated { days_behind: u64 },
    /// Artifacts are at least as new as the source.
    Ready,
}

impl CorpusState {
    /// Prompting urgency: `New` > `Unfilled` > `Outdated` > `Ready`.
    pub fn urgency(&self) -> u8 {
        match self {
            CorpusState::New => 3,
            CorpusState::Unfilled { .. } => 2,
            CorpusState::Outdated { .. } => 1,
            CorpusState::Ready => 0,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            CorpusState::New => "new",
            CorpusState::Unfilled { .. } => "unfilled",
            CorpusState::Outdated { .. } => "outdated",
            CorpusState::Ready => "ready",
        }
    }
}

impl fmt::Display for CorpusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Regeneration result
// ---------------------------------------------------------------------------

/// A module (or the overview) whose regeneration failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFailure {
    pub module: String,
    pub message: String,
}

/// Outcome of one orchestrator run. Returned to the caller, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationResult {
    pub updated: usize,
    pub removed: usize,
    pub updated_paths: Vec<String>,
    pub removed_paths: Vec<String>,
    pub overview_updated: bool,
    pub failures: Vec<ModuleFailure>,
    pub pointer_advanced: bool,
    pub dry_run: bool,
}

impl RegenerationResult {
    pub fn is_partial_failure(&self) -> bool {
        !self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(RevisionId::from("abc123").to_string(), "abc123");
        assert_eq!(ModuleName::from("services").to_string(), "services");
    }

    #[test]
    fn short_revision_truncates() {
        let rev = RevisionId::from("0123456789abcdef");
        assert_eq!(rev.short(), "01234567");
        assert_eq!(RevisionId::from("abc").short(), "abc");
    }

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(ModuleName::from("Generators").slug(), "generators");
        assert_eq!(ModuleName::from("Core Services").slug(), "core-services");
        assert_eq!(ModuleName::from("src/api").slug(), "src-api");
    }

    #[test]
    fn impact_thresholds() {
        assert_eq!(ImpactLevel::classify(1, false, false), ImpactLevel::Low);
        assert_eq!(ImpactLevel::classify(2, false, false), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::classify(4, false, false), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::classify(5, false, false), ImpactLevel::High);
        assert_eq!(ImpactLevel::classify(1, true, false), ImpactLevel::High);
        assert_eq!(ImpactLevel::classify(1, false, true), ImpactLevel::High);
    }

    #[test]
    fn impact_orders_low_to_high() {
        assert!(ImpactLevel::High > ImpactLevel::Medium);
        assert!(ImpactLevel::Medium > ImpactLevel::Low);
    }

    #[test]
    fn corpus_state_urgency_order() {
        let mut states = [
            CorpusState::Ready,
            CorpusState::Outdated { days_behind: 3 },
            CorpusState::New,
            CorpusState::Unfilled { count: 2 },
        ];
        states.sort_by_key(|s| std::cmp::Reverse(s.urgency()));
        let keys: Vec<_> = states.iter().map(CorpusState::key).collect();
        assert_eq!(keys, ["new", "unfilled", "outdated", "ready"]);
    }

    #[test]
    fn change_set_helpers() {
        let mut set = ChangeSet::all_added(["a.rs", "b.rs"]);
        assert_eq!(set.len(), 2);
        assert!(set.has_structural_change());

        set.added.clear();
        set.modified.push("c.rs".to_string());
        assert!(!set.has_structural_change());
        assert!(!set.is_empty());
        assert!(ChangeSet::default().is_empty());
    }

    #[test]
    fn corpus_state_serializes_with_tag() {
        let json = serde_yaml::to_string(&CorpusState::Outdated { days_behind: 2 }).unwrap();
        assert!(json.contains("state: outdated"));
        assert!(json.contains("days_behind: 2"));
    }
}
