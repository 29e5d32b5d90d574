//! Template contexts: serializable rendering payloads built from modules
//! and the inventory.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ctxforge_core::{FileKind, Inventory, Module};

use crate::error::GenerateError;

/// One file row in a module page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCtx {
    pub path: String,
    pub size: u64,
    pub language: String,
    pub binary: bool,
}

/// Languages present in a set of files, with counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageCtx {
    pub name: String,
    pub files: usize,
}

/// Payload for `module.md.tera`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCtx {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub file_count: usize,
    pub files: Vec<FileCtx>,
    pub languages: Vec<LanguageCtx>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Short module entry used by the overview and the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub file_count: usize,
}

/// Payload for `overview.md.tera`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewCtx {
    pub project_name: String,
    pub module_count: usize,
    pub file_count: usize,
    pub modules: Vec<ModuleSummary>,
    pub languages: Vec<LanguageCtx>,
}

/// Payload for `index.md.tera`. Carries no timestamps so re-rendering an
/// unchanged module set yields identical bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexCtx {
    pub project_name: String,
    pub modules: Vec<ModuleSummary>,
}

impl ModuleSummary {
    pub fn from_module(module: &Module) -> Self {
        Self {
            name: module.name.0.clone(),
            slug: module.slug(),
            description: module.description.clone(),
            file_count: module.files.len(),
        }
    }
}

impl ModuleCtx {
    pub fn build(module: &Module, inventory: &Inventory) -> Self {
        let files: Vec<FileCtx> = module
            .files
            .iter()
            .map(|path| {
                let entry = inventory.get(path);
                FileCtx {
                    path: path.clone(),
                    size: entry.map(|e| e.size).unwrap_or(0),
                    language: language_for(path).to_string(),
                    binary: matches!(entry, Some(e) if e.kind == FileKind::Binary),
                }
            })
            .collect();
        Self {
            name: module.name.0.clone(),
            slug: module.slug(),
            description: module.description.clone(),
            file_count: files.len(),
            languages: languages_of(module.files.iter().map(String::as_str)),
            last_modified: inventory.newest_of(&module.files),
            files,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, GenerateError> {
        tera::Context::from_serialize(self).map_err(GenerateError::from)
    }
}

impl OverviewCtx {
    pub fn build(modules: &[Module], inventory: &Inventory) -> Self {
        let file_count = modules.iter().map(|m| m.files.len()).sum();
        Self {
            project_name: project_name(inventory),
            module_count: modules.len(),
            file_count,
            modules: modules.iter().map(ModuleSummary::from_module).collect(),
            languages: languages_of(
                modules
                    .iter()
                    .flat_map(|m| m.files.iter().map(String::as_str)),
            ),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, GenerateError> {
        tera::Context::from_serialize(self).map_err(GenerateError::from)
    }
}

impl IndexCtx {
    pub fn build(project_name: impl Into<String>, modules: &[Module]) -> Self {
        Self {
            project_name: project_name.into(),
            modules: modules.iter().map(ModuleSummary::from_module).collect(),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, GenerateError> {
        tera::Context::from_serialize(self).map_err(GenerateError::from)
    }
}

/// Repository directory name, used as the project title.
pub fn project_name(inventory: &Inventory) -> String {
    inventory
        .root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

const LANGUAGES: &[(&str, &str)] = &[
    ("rs", "Rust"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("py", "Python"),
    ("go", "Go"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("rb", "Ruby"),
    ("c", "C"),
    ("h", "C"),
    ("cpp", "C++"),
    ("hpp", "C++"),
    ("cs", "C#"),
    ("swift", "Swift"),
    ("php", "PHP"),
    ("sh", "Shell"),
    ("sql", "SQL"),
    ("md", "Markdown"),
    ("json", "JSON"),
    ("yaml", "YAML"),
    ("yml", "YAML"),
    ("toml", "TOML"),
    ("html", "HTML"),
    ("css", "CSS"),
];

/// Language label for `path`, by extension.
pub fn language_for(path: &str) -> &'static str {
    let file = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = file.rsplit_once('.') else {
        return "Other";
    };
    LANGUAGES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, name)| *name)
        .unwrap_or("Other")
}

/// Language histogram, most common first, ties by name.
fn languages_of<'a>(paths: impl Iterator<Item = &'a str>) -> Vec<LanguageCtx> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for path in paths {
        *counts.entry(language_for(path)).or_default() += 1;
    }
    let mut languages: Vec<LanguageCtx> = counts
        .into_iter()
        .map(|(name, files)| LanguageCtx {
            name: name.to_string(),
            files,
        })
        .collect();
    languages.sort_by(|a, b| b.files.cmp(&a.files).then_with(|| a.name.cmp(&b.name)));
    languages
}
