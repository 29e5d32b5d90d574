//! Change source port.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use ctxforge_core::{ChangeSet, RevisionId};

use crate::error::VcsError;

/// Boxed future type alias used by [`ChangeSource`] to keep the trait dyn-compatible.
pub type VcsFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, VcsError>> + Send + 'a>>;

/// Which revision a change set was computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseRevision {
    /// The persisted reference pointer.
    Reference(RevisionId),
    /// One revision back from the head (no usable reference).
    Parent(RevisionId),
    /// No base at all: every tracked file is reported as added.
    Root,
}

/// A change set plus the revisions it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changes {
    pub set: ChangeSet,
    pub head: RevisionId,
    pub base: BaseRevision,
    /// A reference that was supplied but no longer exists in history.
    pub stale_reference: Option<RevisionId>,
}

/// Typed access to the version-control history of one repository.
pub trait ChangeSource: Send + Sync {
    /// The revision currently checked out.
    ///
    /// # Errors
    ///
    /// [`VcsError::NotAVersionControlledTree`] outside a work tree.
    fn current_revision(&self) -> VcsFuture<'_, RevisionId>;

    /// Changes between `reference` (or a fallback base) and the head.
    ///
    /// - `None`: diff against one revision back; with a single-revision
    ///   history every tracked file is reported as added.
    /// - `Some(rev)` that no longer resolves: warn and behave as `None`.
    fn changes_since<'a>(&'a self, reference: Option<&'a RevisionId>) -> VcsFuture<'a, Changes>;

    /// Every file the repository tracks, repository-relative.
    fn tracked_files(&self) -> VcsFuture<'_, BTreeSet<String>>;

    /// The persisted reference pointer, if any.
    ///
    /// An unreadable record is reported as absent (with a warning): the
    /// worst outcome is reprocessing more than necessary.
    fn load_reference(&self) -> Option<RevisionId>;

    /// Persist `revision` as the new reference pointer.
    ///
    /// Callers treat failure as safe to ignore: a lost pointer only widens
    /// the next run.
    fn persist_reference(&self, revision: &RevisionId) -> Result<(), VcsError>;
}
