//! LLM-backed generator speaking the Anthropic Messages API over `ureq`.
//!
//! The HTTP call is blocking and runs inside `tokio::task::spawn_blocking`.
//! Index pages are not worth a model call and come from the embedded
//! templates.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ctxforge_core::{ArtifactStatus, GeneratorConfig, Inventory, Module};

use crate::generator::{
    module_front_matter, overview_front_matter, ArtifactBody, ContentGenerator, GenerateFuture,
    TemplateGenerator,
};
use crate::error::GenerateError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

const SYSTEM_PROMPT: &str = "You write concise technical documentation for AI coding \
assistants. Answer in GitHub-flavoured Markdown without front-matter. Be specific: name \
real types, functions and files. Do not invent behavior that the excerpts do not show.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Concatenated text blocks of a Messages API response body.
pub fn parse_response(body: &str) -> Result<String, GenerateError> {
    let response: MessagesResponse = serde_json::from_str(body)?;
    let text = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        return Err(GenerateError::EmptyResponse);
    }
    Ok(format!("{text}\n"))
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().chars().take(300).collect(),
    }
}

fn post_messages(
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    request: MessagesRequest,
) -> Result<String, GenerateError> {
    let response = agent
        .post(&endpoint)
        .set("x-api-key", &api_key)
        .set("anthropic-version", ANTHROPIC_VERSION)
        .set("content-type", "application/json")
        .send_json(&request);
    let response = match response {
        Ok(response) => response,
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            return Err(GenerateError::Api {
                status,
                message: api_error_message(&body),
            });
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(GenerateError::Http(transport.to_string()));
        }
    };
    let body = response
        .into_string()
        .map_err(|e| GenerateError::Http(e.to_string()))?;
    parse_response(&body)
}

// ---------------------------------------------------------------------------
// LlmGenerator
// ---------------------------------------------------------------------------

/// Generator that asks a model to write each page from bounded excerpts.
pub struct LlmGenerator {
    config: GeneratorConfig,
    api_key: String,
    repo_root: PathBuf,
    agent: ureq::Agent,
    templates: TemplateGenerator,
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("model", &self.config.model)
            .field("endpoint", &self.config.endpoint)
            .field("repo_root", &self.repo_root)
            .finish_non_exhaustive()
    }
}

impl LlmGenerator {
    pub fn new(
        config: GeneratorConfig,
        api_key: impl Into<String>,
        repo_root: impl Into<PathBuf>,
        templates: TemplateGenerator,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            config,
            api_key: api_key.into(),
            repo_root: repo_root.into(),
            agent,
            templates,
        }
    }

    /// Read the API key from the variable named by `config.api_key_env`.
    pub fn from_env(
        config: GeneratorConfig,
        repo_root: &Path,
        templates: TemplateGenerator,
    ) -> Result<Self, GenerateError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerateError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Ok(Self::new(config, api_key, repo_root, templates))
    }

    /// First `max_excerpt_lines` lines of up to `max_excerpt_files` text files.
    fn excerpts(&self, module: &Module, inventory: &Inventory) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for path in &module.files {
            if out.len() >= self.config.max_excerpt_files {
                break;
            }
            if !inventory.is_text(path) {
                continue;
            }
            let full = self.repo_root.join(path);
            match std::fs::read_to_string(&full) {
                Ok(content) => {
                    let excerpt: Vec<&str> =
                        content.lines().take(self.config.max_excerpt_lines).collect();
                    out.push((path.clone(), excerpt.join("\n")));
                }
                Err(err) => {
                    tracing::debug!(path = %full.display(), "skipping excerpt: {err}");
                }
            }
        }
        out
    }

    pub fn module_prompt(&self, module: &Module, inventory: &Inventory) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Document the module `{}`.", module.name);
        let _ = writeln!(prompt, "Summary: {}\n", module.description);
        let _ = writeln!(prompt, "Files ({}):", module.files.len());
        for path in &module.files {
            let _ = writeln!(prompt, "- {path}");
        }
        for (path, excerpt) in self.excerpts(module, inventory) {
            let _ = writeln!(prompt, "\n### {path}\n```\n{excerpt}\n```");
        }
        let _ = writeln!(
            prompt,
            "\nWrite the sections: Purpose, Key concepts, Dependencies, Gotchas. \
             Start with a `# {}` heading.",
            module.name
        );
        prompt
    }

    pub fn overview_prompt(&self, modules: &[Module], inventory: &Inventory) -> String {
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "Write an architecture overview of the project `{}`.\n",
            crate::context::project_name(inventory)
        );
        let _ = writeln!(prompt, "Modules ({}):", modules.len());
        for module in modules {
            let _ = writeln!(
                prompt,
                "- {} ({} files): {}",
                module.name,
                module.files.len(),
                module.description
            );
        }
        let _ = writeln!(
            prompt,
            "\nWrite the sections: Architecture, Module map, Conventions. \
             Link each module as `modules/<slug>.md`."
        );
        prompt
    }

    async fn complete(&self, prompt: String) -> Result<String, GenerateError> {
        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        };
        let agent = self.agent.clone();
        let endpoint = self.config.endpoint.clone();
        let api_key = self.api_key.clone();
        tracing::debug!(model = %self.config.model, "requesting completion");
        tokio::task::spawn_blocking(move || post_messages(agent, endpoint, api_key, request))
            .await
            .map_err(|e| GenerateError::Join(e.to_string()))?
    }
}

impl ContentGenerator for LlmGenerator {
    fn generate_module<'a>(
        &'a self,
        module: &'a Module,
        inventory: &'a Inventory,
    ) -> GenerateFuture<'a> {
        Box::pin(async move {
            let prompt = self.module_prompt(module, inventory);
            let text = self.complete(prompt).await?;
            let matter = module_front_matter(module, inventory, ArtifactStatus::Filled);
            Ok(ArtifactBody(matter.render(&text)?))
        })
    }

    fn generate_overview<'a>(
        &'a self,
        modules: &'a [Module],
        inventory: &'a Inventory,
    ) -> GenerateFuture<'a> {
        Box::pin(async move {
            let prompt = self.overview_prompt(modules, inventory);
            let text = self.complete(prompt).await?;
            let matter = overview_front_matter(modules, inventory, ArtifactStatus::Filled);
            Ok(ArtifactBody(matter.render(&text)?))
        })
    }

    fn render_index(&self, modules: &[Module], inventory: &Inventory) -> Result<String, GenerateError> {
        self.templates.index_document(modules, inventory)
    }
}
