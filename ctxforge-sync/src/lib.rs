//! # ctxforge-sync
//!
//! Staleness detection and incremental regeneration of the artifact tree.
//!
//! - [`classifier`]: corpus state (`new`, `unfilled`, `outdated`, `ready`)
//! - [`analyzer`]: change set to per-module impact, overview trigger, cost
//! - [`orchestrator`]: filtering, per-module regeneration, orphan cleanup,
//!   overview regeneration, pointer advance
//! - [`pipeline`]: entrypoints wiring a change source, a generator and the
//!   configuration together

pub mod analyzer;
pub mod classifier;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod writer;

pub use analyzer::{analyze, Analysis, CostEstimate};
pub use classifier::{classify, ClassifyOptions, CorpusReport};
pub use error::SyncError;
pub use orchestrator::{filter_changes, Orchestrator, RunOptions, RunReport, Stage};
pub use pipeline::{full_build, pending, preview, update, Pending, UpdateReport};
pub use writer::WriteResult;
