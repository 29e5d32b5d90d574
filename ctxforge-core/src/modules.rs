//! Directory-based module grouping.
//!
//! A module is keyed by the first directory of a file's path, or by the first
//! two directories when the first one is a conventional source root
//! (`src/api/handler.rs` belongs to `src/api`). Files at the repository root
//! belong to [`ROOT_MODULE`].
//!
//! Grouping is a pure function of the path list: no filesystem access, no
//! shared state. The same inventory always yields the same modules.

use std::collections::BTreeMap;

use crate::types::{Module, ModuleName};

/// Module name for files that live directly at the repository root.
pub const ROOT_MODULE: &str = "root";

/// Default directories treated as source roots (one extra nesting level).
pub const DEFAULT_SOURCE_ROOTS: &[&str] = &["src", "lib", "packages", "apps"];

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("root", "Top-level project files"),
    ("src", "Main source code"),
    ("lib", "Library code"),
    ("app", "Application code"),
    ("apps", "Applications"),
    ("packages", "Workspace packages"),
    ("api", "API layer"),
    ("cli", "Command-line interface"),
    ("commands", "Command implementations"),
    ("components", "UI components"),
    ("config", "Configuration"),
    ("core", "Core domain logic"),
    ("docs", "Documentation"),
    ("generators", "Content generators"),
    ("hooks", "Hooks"),
    ("models", "Data models"),
    ("prompts", "Prompt templates"),
    ("scripts", "Build and utility scripts"),
    ("services", "Service layer"),
    ("templates", "Templates"),
    ("test", "Test suites"),
    ("tests", "Test suites"),
    ("types", "Type definitions"),
    ("utils", "Shared utilities"),
];

/// Resolve the module that owns `path`.
pub fn module_name_for(path: &str, source_roots: &[String]) -> ModuleName {
    let normalized = path.trim_start_matches("./");
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    let dirs = match segments.split_last() {
        Some((_, dirs)) => dirs,
        None => &[][..],
    };

    match dirs {
        [] => ModuleName::from(ROOT_MODULE),
        [first, second, ..] if source_roots.iter().any(|root| root == first) => {
            ModuleName::from(format!("{first}/{second}"))
        }
        [first, ..] => ModuleName::from(*first),
    }
}

/// Human description for a module, from the static table or derived.
pub fn describe(name: &ModuleName) -> String {
    let key = name.0.rsplit('/').next().unwrap_or(name.0.as_str());
    DESCRIPTIONS
        .iter()
        .find(|(dir, _)| dir.eq_ignore_ascii_case(key))
        .map(|(_, description)| (*description).to_string())
        .unwrap_or_else(|| format!("Files under `{}`", name.0))
}

/// Group `paths` into modules, sorted by module name.
pub fn group_modules<'a, I>(paths: I, source_roots: &[String]) -> Vec<Module>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut grouped: BTreeMap<ModuleName, Vec<String>> = BTreeMap::new();
    for path in paths {
        grouped
            .entry(module_name_for(path, source_roots))
            .or_default()
            .push(path.to_string());
    }

    grouped
        .into_iter()
        .map(|(name, mut files)| {
            files.sort();
            files.dedup();
            Module {
                description: describe(&name),
                name,
                files,
            }
        })
        .collect()
}

/// Modules whose artifact slug is already taken by an earlier module.
///
/// `src/api` and `src-api` both slug to `src-api`; the first module in name
/// order keeps the artifact and every later one maps to that owner.
pub fn slug_clashes(modules: &[Module]) -> BTreeMap<ModuleName, ModuleName> {
    let mut owners: BTreeMap<String, &ModuleName> = BTreeMap::new();
    let mut clashes = BTreeMap::new();
    for module in modules {
        let owner = *owners.entry(module.slug()).or_insert(&module.name);
        if owner != &module.name {
            clashes.insert(module.name.clone(), owner.clone());
        }
    }
    clashes
}

/// `DEFAULT_SOURCE_ROOTS` as owned strings.
pub fn default_source_roots() -> Vec<String> {
    DEFAULT_SOURCE_ROOTS.iter().map(|s| (*s).to_string()).collect()
}
