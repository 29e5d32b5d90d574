//! # ctxforge-vcs
//!
//! Change source adapter: turns git history into a typed [`ChangeSet`]
//! relative to a persisted reference pointer.
//!
//! [`ChangeSet`]: ctxforge_core::ChangeSet

pub mod error;
pub mod git;
pub mod reference;
pub mod source;

pub use error::VcsError;
pub use git::GitChangeSource;
pub use reference::{ReferenceRecord, ReferenceStore};
pub use source::{BaseRevision, ChangeSource, Changes, VcsFuture};
