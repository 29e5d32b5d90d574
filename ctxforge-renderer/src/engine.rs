//! Tera rendering engine.
//!
//! | Artifact  | Template            | Output path                     |
//! |-----------|---------------------|---------------------------------|
//! | Module    | `module.md.tera`    | `docs/modules/<slug>.md`        |
//! | Overview  | `overview.md.tera`  | `docs/overview.md`              |
//! | Index     | `index.md.tera`     | `docs/README.md`                |
//!
//! Any of the three can be overridden by a same-named file under
//! `<repo>/.ctxforge/templates/`.

use std::path::Path;

use tera::Tera;

use crate::error::{io_err, GenerateError};

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("module.md.tera", include_str!("templates/module.md.tera")),
    ("overview.md.tera", include_str!("templates/overview.md.tera")),
    ("index.md.tera", include_str!("templates/index.md.tera")),
];

// ---------------------------------------------------------------------------
// Template loading
// ---------------------------------------------------------------------------

/// Embedded templates, each replaced by `<dir>/<name>` when that file exists.
fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, GenerateError> {
    let mut items = Vec::with_capacity(TPLS.len());
    for (name, embedded) in TPLS {
        let content = match user_template_dir.map(|dir| dir.join(name)) {
            Some(path) if path.is_file() => {
                tracing::debug!(template = %name, "using template override");
                std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?
            }
            _ => (*embedded).to_string(),
        };
        items.push((*name, content));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// The three kinds of document the engine renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Module,
    Overview,
    Index,
}

impl ArtifactKind {
    pub fn template_name(&self) -> &'static str {
        match self {
            ArtifactKind::Module => "module.md.tera",
            ArtifactKind::Overview => "overview.md.tera",
            ArtifactKind::Index => "index.md.tera",
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may hold `module.md.tera`, `overview.md.tera` or
/// `index.md.tera`; other files there are ignored.
pub struct TemplateEngine {
    tera: Tera,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine {
    /// Load embedded templates plus any overrides found in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, GenerateError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render `kind` with `ctx`. Line endings are normalised to `\n`.
    pub fn render(&self, kind: ArtifactKind, ctx: &tera::Context) -> Result<String, GenerateError> {
        let content = self.tera.render(kind.template_name(), ctx)?;
        Ok(content.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IndexCtx;
    use ctxforge_core::{Module, ModuleName};
    use tempfile::TempDir;

    fn modules() -> Vec<Module> {
        vec![
            Module {
                name: ModuleName::from("generators"),
                description: "Code generators".to_string(),
                files: vec!["generators/a.ts".to_string()],
            },
            Module {
                name: ModuleName::from("src/services"),
                description: "Business logic".to_string(),
                files: vec!["src/services/a.ts".to_string(), "src/services/b.ts".to_string()],
            },
        ]
    }

    #[test]
    fn embedded_templates_load() {
        TemplateEngine::new(None).expect("embedded templates should parse");
    }

    #[test]
    fn index_links_every_module_by_slug() {
        let engine = TemplateEngine::new(None).unwrap();
        let ctx = IndexCtx::build("shop", &modules()).to_tera_context().unwrap();
        let out = engine.render(ArtifactKind::Index, &ctx).unwrap();
        assert!(out.contains("[generators](modules/generators.md)"));
        assert!(out.contains("[src/services](modules/src-services.md)"));
        assert!(out.contains("(2 files)"));
        assert!(out.contains("(1 file)"));
    }

    #[test]
    fn empty_index_says_so() {
        let engine = TemplateEngine::new(None).unwrap();
        let ctx = IndexCtx::build("shop", &[]).to_tera_context().unwrap();
        let out = engine.render(ArtifactKind::Index, &ctx).unwrap();
        assert!(out.contains("_No modules yet._"));
    }

    #[test]
    fn user_override_replaces_embedded_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("index.md.tera"),
            "custom index for {{ project_name }}\r\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let engine = TemplateEngine::new(Some(dir.path())).unwrap();
        let ctx = IndexCtx::build("shop", &modules()).to_tera_context().unwrap();
        let out = engine.render(ArtifactKind::Index, &ctx).unwrap();
        assert_eq!(out, "custom index for shop\n");
    }

    #[test]
    fn broken_override_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("module.md.tera"), "{% for x in %}").unwrap();
        let err = TemplateEngine::new(Some(dir.path())).unwrap_err();
        assert!(matches!(err, GenerateError::Tera(_)));
    }

    #[test]
    fn unrelated_tera_files_are_not_loaded() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/index.md.tera"), "{% if %}").unwrap();
        std::fs::write(dir.path().join("extra.md.tera"), "{% for x in %}").unwrap();

        let engine = TemplateEngine::new(Some(dir.path())).unwrap();
        let ctx = IndexCtx::build("shop", &modules()).to_tera_context().unwrap();
        let out = engine.render(ArtifactKind::Index, &ctx).unwrap();
        assert!(out.contains("[generators](modules/generators.md)"));
    }

    #[test]
    fn missing_override_dir_is_fine() {
        let dir = TempDir::new().unwrap();
        TemplateEngine::new(Some(&dir.path().join("absent"))).unwrap();
    }
}
