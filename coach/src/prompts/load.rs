//! Load the prompt catalog from a directory of YAML files, falling back to embedded defaults.
//!
//! **Canonical source**: default prompt text lives in `coach/prompts/*.yaml`; the files are
//! embedded at compile time and used when no `PROMPTS_DIR` or directory is present.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{PromptCatalog, PromptTemplate, TaskPrompt, TemplateError};

macro_rules! embed_prompt_yaml {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}

/// File name and embedded content for every built-in prompt.
const EMBEDDED: &[(&str, &str)] = &[
    ("email.yaml", embed_prompt_yaml!("email.yaml")),
    ("plan.yaml", embed_prompt_yaml!("plan.yaml")),
    ("chat.yaml", embed_prompt_yaml!("chat.yaml")),
    ("summary.yaml", embed_prompt_yaml!("summary.yaml")),
];

/// Default directory name when `PROMPTS_DIR` is not set.
const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Error when loading prompts from a directory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
    #[error("invalid template in {path}: {source}")]
    Template {
        path: String,
        #[source]
        source: TemplateError,
    },
}

/// On-disk shape of one prompt file.
#[derive(Debug, Deserialize)]
struct PromptFile {
    name: String,
    #[serde(default)]
    premise: String,
    #[serde(default)]
    input_variables: Vec<String>,
    template: String,
}

impl PromptFile {
    fn into_task_prompt(self, path: &str) -> Result<TaskPrompt, LoadError> {
        let template = PromptTemplate::new(self.name, self.input_variables, self.template)
            .map_err(|source| LoadError::Template {
                path: path.to_string(),
                source,
            })?;
        Ok(TaskPrompt {
            premise: self.premise.trim_end().to_string(),
            template,
        })
    }
}

/// Returns `dir` if `Some`, else `PROMPTS_DIR` env, else `DEFAULT_PROMPTS_DIR`.
fn prompts_dir(dir: Option<&Path>) -> PathBuf {
    dir.map(PathBuf::from).unwrap_or_else(|| {
        std::env::var("PROMPTS_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPTS_DIR))
    })
}

fn parse_prompt(content: &str, path: &str) -> Result<TaskPrompt, LoadError> {
    let file: PromptFile = serde_yaml::from_str(content).map_err(|e| LoadError::ParseYaml {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    file.into_task_prompt(path)
}

/// Loads the catalog from `dir`: every built-in file found there replaces the embedded
/// default; missing files keep the default. Other `*.yaml` files add new templates.
///
/// If `dir` is `None`, uses `PROMPTS_DIR` env or `./prompts`. Fails when the directory is
/// missing or when a present file fails to parse or validate.
pub fn load(dir: Option<&Path>) -> Result<PromptCatalog, LoadError> {
    let base = prompts_dir(dir);
    if !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }

    let mut catalog = default_from_embedded();
    let entries = std::fs::read_dir(&base).map_err(|e| LoadError::ReadFile {
        path: base.display().to_string(),
        message: e.to_string(),
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|x| x.to_str()) == Some("yaml"))
        .collect();
    paths.sort();

    for path in paths {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|e| LoadError::ReadFile {
            path: display.clone(),
            message: e.to_string(),
        })?;
        catalog.insert(parse_prompt(&content, &display)?);
    }
    Ok(catalog)
}

/// Returns the catalog parsed from the embedded `coach/prompts/*.yaml`.
///
/// Embedded files are covered by tests, so a parse failure here is skipped with a warning
/// rather than aborting.
pub fn default_from_embedded() -> PromptCatalog {
    let mut catalog = PromptCatalog::default();
    for (name, content) in EMBEDDED {
        match parse_prompt(content, name) {
            Ok(prompt) => catalog.insert(prompt),
            Err(e) => tracing::warn!(file = %name, error = %e, "embedded prompt skipped"),
        }
    }
    catalog
}

/// Loads from `dir` if it exists; otherwise returns the embedded catalog.
pub fn load_or_default(dir: Option<&Path>) -> PromptCatalog {
    load(dir).unwrap_or_else(|_| default_from_embedded())
}
