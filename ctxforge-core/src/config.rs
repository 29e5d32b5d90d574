//! Layered YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! <config_dir>/ctxforge/config.yaml   (user defaults, optional)
//! <repo>/.ctxforge/
//!   config.yaml                       (per-repository, optional)
//!   state.json                        (reference pointer, owned by ctxforge-vcs)
//!   templates/*.tera                  (template overrides, optional)
//! ```
//!
//! Resolution: built-in defaults, then the user file, then the repository
//! file. Only keys present in a file override the layer below.
//!
//! # API pattern
//!
//! - `fn_at(…, user_config_dir: Option<&Path>)`: explicit locations; used in tests
//! - `fn(…)`: derives the user location from `dirs::config_dir()`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::inventory::IgnoreRules;
use crate::modules::default_source_roots;

/// Directory holding ctxforge's own files inside a repository.
pub const STATE_DIR: &str = ".ctxforge";
/// Default artifact root, relative to the repository.
pub const DEFAULT_ARTIFACT_ROOT: &str = ".context";
/// Default mtime tolerance for the outdated check.
pub const DEFAULT_STALE_TOLERANCE_SECS: u64 = 2;

/// Which content generator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Offline Tera skeletons marked `unfilled`.
    #[default]
    Template,
    /// Remote LLM completion.
    Llm,
}

/// Settings for the content generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    pub model: String,
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
    /// Lines read from each file when building prompts.
    pub max_excerpt_lines: usize,
    /// Files excerpted per module prompt.
    pub max_excerpt_files: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::Template,
            model: "claude-sonnet-4-20250514".to_string(),
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            max_tokens: 2048,
            max_excerpt_lines: 60,
            max_excerpt_files: 12,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Artifact root, relative to the repository unless absolute.
    pub artifact_root: PathBuf,
    /// Directories whose children become modules of their own.
    pub source_roots: Vec<String>,
    /// Extra repository-relative prefixes excluded from analysis.
    pub ignore: Vec<String>,
    pub stale_tolerance_secs: u64,
    pub generator: GeneratorConfig,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from(DEFAULT_ARTIFACT_ROOT),
            source_roots: default_source_roots(),
            ignore: Vec::new(),
            stale_tolerance_secs: DEFAULT_STALE_TOLERANCE_SECS,
            generator: GeneratorConfig::default(),
        }
    }
}

impl ForgeConfig {
    /// Absolute artifact root for `repo`.
    pub fn artifact_root_in(&self, repo: &Path) -> PathBuf {
        if self.artifact_root.is_absolute() {
            self.artifact_root.clone()
        } else {
            repo.join(&self.artifact_root)
        }
    }

    /// Ignore rules for `repo`: defaults, configured prefixes, and the
    /// artifact root when it lives inside the repository.
    pub fn ignore_rules(&self, repo: &Path) -> IgnoreRules {
        let mut rules = IgnoreRules::with_prefixes(&self.ignore);
        rules.add_prefix(STATE_DIR);
        let artifact_root = self.artifact_root_in(repo);
        if let Ok(rel) = artifact_root.strip_prefix(repo) {
            rules.add_prefix(&rel.to_string_lossy());
        }
        rules
    }

    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(v) = layer.artifact_root {
            self.artifact_root = v;
        }
        if let Some(v) = layer.source_roots {
            self.source_roots = v;
        }
        if let Some(v) = layer.ignore {
            self.ignore = v;
        }
        if let Some(v) = layer.stale_tolerance_secs {
            self.stale_tolerance_secs = v;
        }
        if let Some(generator) = layer.generator {
            let target = &mut self.generator;
            if let Some(v) = generator.kind {
                target.kind = v;
            }
            if let Some(v) = generator.model {
                target.model = v;
            }
            if let Some(v) = generator.endpoint {
                target.endpoint = v;
            }
            if let Some(v) = generator.api_key_env {
                target.api_key_env = v;
            }
            if let Some(v) = generator.max_tokens {
                target.max_tokens = v;
            }
            if let Some(v) = generator.max_excerpt_lines {
                target.max_excerpt_lines = v;
            }
            if let Some(v) = generator.max_excerpt_files {
                target.max_excerpt_files = v;
            }
        }
    }
}

/// On-disk shape: every key optional so files can be partial.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigLayer {
    artifact_root: Option<PathBuf>,
    source_roots: Option<Vec<String>>,
    ignore: Option<Vec<String>>,
    stale_tolerance_secs: Option<u64>,
    generator: Option<GeneratorLayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratorLayer {
    kind: Option<GeneratorKind>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key_env: Option<String>,
    max_tokens: Option<u32>,
    max_excerpt_lines: Option<usize>,
    max_excerpt_files: Option<usize>,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<repo>/.ctxforge/`
pub fn state_dir(repo: &Path) -> PathBuf {
    repo.join(STATE_DIR)
}

/// `<repo>/.ctxforge/config.yaml`
pub fn repo_config_path(repo: &Path) -> PathBuf {
    state_dir(repo).join("config.yaml")
}

/// `<repo>/.ctxforge/templates/`
pub fn template_dir(repo: &Path) -> PathBuf {
    state_dir(repo).join("templates")
}

/// `<user_config_dir>/ctxforge/config.yaml`
pub fn user_config_path(user_config_dir: &Path) -> PathBuf {
    user_config_dir.join("ctxforge").join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

fn read_layer(path: &Path) -> Result<Option<ConfigLayer>, CoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };
    if contents.trim().is_empty() {
        return Ok(Some(ConfigLayer::default()));
    }
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
}

/// Resolve the configuration for `repo` with an explicit user config dir.
pub fn load_at(repo: &Path, user_config_dir: Option<&Path>) -> Result<ForgeConfig, CoreError> {
    let mut config = ForgeConfig::default();
    if let Some(dir) = user_config_dir {
        if let Some(layer) = read_layer(&user_config_path(dir))? {
            config.apply(layer);
        }
    }
    if let Some(layer) = read_layer(&repo_config_path(repo))? {
        config.apply(layer);
    }
    Ok(config)
}

/// `load_at` convenience wrapper using `dirs::config_dir()`.
pub fn load(repo: &Path) -> Result<ForgeConfig, CoreError> {
    let user_dir = dirs::config_dir();
    load_at(repo, user_dir.as_deref())
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Write `config` to `<repo>/.ctxforge/config.yaml` unless the file exists.
///
/// Returns `true` when a file was written. Write flow: serialize →
/// `.yaml.tmp` sibling → `rename`.
pub fn write_default_at(repo: &Path, config: &ForgeConfig) -> Result<bool, CoreError> {
    let path = repo_config_path(repo);
    if path.exists() {
        return Ok(false);
    }
    save_at(repo, config)?;
    Ok(true)
}

/// Atomically overwrite `<repo>/.ctxforge/config.yaml`.
pub fn save_at(repo: &Path, config: &ForgeConfig) -> Result<(), CoreError> {
    let dir = state_dir(repo);
    std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    let path = repo_config_path(repo);
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}
