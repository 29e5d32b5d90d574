//! # ctxforge-renderer
//!
//! Content generation for the artifact tree: the [`ContentGenerator`] port,
//! the offline Tera [`TemplateGenerator`] and the HTTP [`LlmGenerator`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ctxforge_core::{Inventory, Module};
//! use ctxforge_renderer::{ContentGenerator, TemplateGenerator};
//!
//! async fn page(repo: &std::path::Path, module: &Module, inventory: &Inventory) {
//!     if let Ok(generator) = TemplateGenerator::for_repo(repo) {
//!         if let Ok(body) = generator.generate_module(module, inventory).await {
//!             println!("{} bytes", body.as_str().len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod generator;
pub mod llm;

pub use engine::{ArtifactKind, TemplateEngine};
pub use error::GenerateError;
pub use generator::{from_config, ArtifactBody, ContentGenerator, GenerateFuture, TemplateGenerator};
pub use llm::LlmGenerator;
