//! ctxforge core library: domain types, module grouping, inventory,
//! front-matter, artifact layout, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes, change sets, impact and corpus state
//! - [`modules`]: directory-based module grouping
//! - [`inventory`]: repository file scan with text/binary classification
//! - [`frontmatter`]: artifact front-matter render/parse
//! - [`layout`]: artifact tree paths
//! - [`config`]: layered YAML configuration
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod frontmatter;
pub mod inventory;
pub mod layout;
pub mod modules;
pub mod types;

pub use config::{ForgeConfig, GeneratorConfig, GeneratorKind};
pub use error::CoreError;
pub use frontmatter::{ArtifactStatus, FrontMatter};
pub use inventory::{FileEntry, FileKind, IgnoreRules, Inventory};
pub use layout::ArtifactLayout;
pub use types::{
    ChangeSet, CorpusState, ImpactLevel, Module, ModuleFailure, ModuleImpact, ModuleName,
    RegenerationResult, RenamedPath, RevisionId,
};
