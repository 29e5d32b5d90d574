//! Content-generation port and the offline Tera implementation.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::Utc;

use ctxforge_core::{
    config::template_dir, ArtifactStatus, ForgeConfig, FrontMatter, GeneratorKind, Inventory,
    Module,
};

use crate::context::{project_name, IndexCtx, ModuleCtx, OverviewCtx};
use crate::engine::{ArtifactKind, TemplateEngine};
use crate::error::GenerateError;
use crate::llm::LlmGenerator;

/// Boxed future type alias used by [`ContentGenerator`] to keep the trait dyn-compatible.
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ArtifactBody, GenerateError>> + Send + 'a>>;

/// A complete artifact document, front-matter included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBody(pub String);

impl ArtifactBody {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Produces artifact content for modules and the project overview.
pub trait ContentGenerator: Send + Sync {
    /// Document for one module.
    fn generate_module<'a>(
        &'a self,
        module: &'a Module,
        inventory: &'a Inventory,
    ) -> GenerateFuture<'a>;

    /// Project overview across every current module.
    fn generate_overview<'a>(
        &'a self,
        modules: &'a [Module],
        inventory: &'a Inventory,
    ) -> GenerateFuture<'a>;

    /// Index page (`docs/README.md`). Deterministic for a given module set.
    fn render_index(&self, modules: &[Module], inventory: &Inventory) -> Result<String, GenerateError>;
}

// ---------------------------------------------------------------------------
// Front-matter helpers
// ---------------------------------------------------------------------------

pub(crate) fn module_front_matter(
    module: &Module,
    inventory: &Inventory,
    status: ArtifactStatus,
) -> FrontMatter {
    FrontMatter {
        module: Some(module.name.0.clone()),
        files: Some(module.files.len()),
        last_modified: inventory.newest_of(&module.files),
        generated: Some(Utc::now()),
        status: Some(status),
    }
}

pub(crate) fn overview_front_matter(
    modules: &[Module],
    inventory: &Inventory,
    status: ArtifactStatus,
) -> FrontMatter {
    FrontMatter {
        module: None,
        files: Some(modules.iter().map(|m| m.files.len()).sum()),
        last_modified: inventory.newest_of(modules.iter().flat_map(|m| m.files.iter())),
        generated: Some(Utc::now()),
        status: Some(status),
    }
}

// ---------------------------------------------------------------------------
// TemplateGenerator
// ---------------------------------------------------------------------------

/// Offline generator: Tera skeletons with placeholder sections, marked
/// `status: unfilled` for an assistant to complete.
#[derive(Debug)]
pub struct TemplateGenerator {
    engine: TemplateEngine,
}

impl TemplateGenerator {
    pub fn new(engine: TemplateEngine) -> Self {
        Self { engine }
    }

    /// Embedded templates plus overrides from `<repo>/.ctxforge/templates/`.
    pub fn for_repo(repo: &Path) -> Result<Self, GenerateError> {
        Ok(Self::new(TemplateEngine::new(Some(&template_dir(repo)))?))
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    pub fn module_document(&self, module: &Module, inventory: &Inventory) -> Result<ArtifactBody, GenerateError> {
        let ctx = ModuleCtx::build(module, inventory).to_tera_context()?;
        let body = self.engine.render(ArtifactKind::Module, &ctx)?;
        let matter = module_front_matter(module, inventory, ArtifactStatus::Unfilled);
        Ok(ArtifactBody(matter.render(&body)?))
    }

    pub fn overview_document(&self, modules: &[Module], inventory: &Inventory) -> Result<ArtifactBody, GenerateError> {
        let ctx = OverviewCtx::build(modules, inventory).to_tera_context()?;
        let body = self.engine.render(ArtifactKind::Overview, &ctx)?;
        let matter = overview_front_matter(modules, inventory, ArtifactStatus::Unfilled);
        Ok(ArtifactBody(matter.render(&body)?))
    }

    pub fn index_document(&self, modules: &[Module], inventory: &Inventory) -> Result<String, GenerateError> {
        let ctx = IndexCtx::build(project_name(inventory), modules).to_tera_context()?;
        self.engine.render(ArtifactKind::Index, &ctx)
    }
}

impl ContentGenerator for TemplateGenerator {
    fn generate_module<'a>(
        &'a self,
        module: &'a Module,
        inventory: &'a Inventory,
    ) -> GenerateFuture<'a> {
        Box::pin(async move { self.module_document(module, inventory) })
    }

    fn generate_overview<'a>(
        &'a self,
        modules: &'a [Module],
        inventory: &'a Inventory,
    ) -> GenerateFuture<'a> {
        Box::pin(async move { self.overview_document(modules, inventory) })
    }

    fn render_index(&self, modules: &[Module], inventory: &Inventory) -> Result<String, GenerateError> {
        self.index_document(modules, inventory)
    }
}

/// Build the generator selected by `config` for `repo`.
///
/// # Errors
///
/// Template parse failures, or [`GenerateError::MissingApiKey`] for the LLM
/// generator when its key variable is unset.
pub fn from_config(
    config: &ForgeConfig,
    repo: &Path,
) -> Result<Box<dyn ContentGenerator>, GenerateError> {
    let templates = TemplateGenerator::for_repo(repo)?;
    match config.generator.kind {
        GeneratorKind::Template => Ok(Box::new(templates)),
        GeneratorKind::Llm => Ok(Box::new(LlmGenerator::from_env(
            config.generator.clone(),
            repo,
            templates,
        )?)),
    }
}
