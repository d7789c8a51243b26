//! Subcommand bodies. Each returns a [`Report`] that `main` prints as text or JSON.
//!
//! Commands take the gateway and catalog as arguments so they run against
//! [`coach::MockGateway`] in tests.

use std::path::{Path, PathBuf};

use coach::llm::SplitError;
use coach::prompts::{LoadError as PromptsLoadError, PromptCatalog};
use coach::{
    ChatMessage, ChatRequest, CoachConfig, CoachError, ConfigError, EmailRequest, EmailRules,
    GatewayError, ModelGateway, PlanExtraction, PlanRequest, RetryOrchestrator, TextSplitter,
    ValidationRuleSet,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Coach(#[from] CoachError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Prompts(#[from] PromptsLoadError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Usage(String),
}

/// Command result: human text, machine JSON and whether the command succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub text: String,
    pub json: Value,
    pub success: bool,
}

impl Report {
    fn ok(text: impl Into<String>, json: Value) -> Self {
        Self {
            text: text.into(),
            json,
            success: true,
        }
    }
}

pub fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Text from `--file` when given, else the joined positional words.
pub fn input_text(words: &[String], file: Option<&Path>) -> Result<String, CliError> {
    match file {
        Some(p) => read_file(p),
        None if words.is_empty() => Err(CliError::Usage(
            "provide text as arguments or with --file".to_string(),
        )),
        None => Ok(words.join(" ")),
    }
}

/// Catalog from the configured prompts dir, or the embedded one.
pub fn load_catalog(cfg: &CoachConfig) -> Result<PromptCatalog, CliError> {
    match &cfg.prompts_dir {
        Some(dir) => Ok(coach::prompts::load(Some(dir.as_path()))?),
        None => Ok(coach::prompts::load_or_default(None)),
    }
}

pub async fn email(
    orchestrator: &RetryOrchestrator,
    catalog: &PromptCatalog,
    request: &EmailRequest,
) -> Result<Report, CliError> {
    let html = coach::compose_email(orchestrator, catalog, request).await?;
    Ok(Report::ok(html.clone(), json!({ "html": html })))
}

fn plan_text(out: &PlanExtraction) -> String {
    let mut lines = vec![out.summary.clone()];
    if let Some(plan) = out.plan() {
        lines.push(String::new());
        lines.push(format!("Goal: {}", plan.goal));
        for step in &plan.steps {
            lines.push(format!(
                "{}. {}: {}",
                step.number, step.action.name, step.action.description
            ));
            for link in step.action.raw_links.iter().flatten() {
                lines.push(format!("   - {}", link));
            }
        }
    }
    lines.join("\n")
}

pub async fn plan(
    gateway: &dyn ModelGateway,
    catalog: &PromptCatalog,
    request: &PlanRequest,
) -> Result<Report, CliError> {
    let out = coach::propose_plan(gateway, catalog, request).await?;
    let json = serde_json::to_value(&out).map_err(|source| CliError::Json {
        path: PathBuf::from("<plan>"),
        source,
    })?;
    Ok(Report::ok(plan_text(&out), json))
}

/// Prior turns from a JSON array of `{"role": ..., "content": ...}` objects.
pub fn read_history(path: &Path) -> Result<Vec<ChatMessage>, CliError> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn chat(
    gateway: &dyn ModelGateway,
    catalog: &PromptCatalog,
    request: &ChatRequest,
) -> Result<Report, CliError> {
    let reply = coach::chat_reply(gateway, catalog, request).await?;
    Ok(Report::ok(reply.clone(), json!({ "reply": reply })))
}

pub async fn summarize(
    gateway: &dyn ModelGateway,
    catalog: &PromptCatalog,
    text: &str,
) -> Result<Report, CliError> {
    let summary = coach::summarize(gateway, catalog, text).await?;
    Ok(Report::ok(summary.clone(), json!({ "summary": summary })))
}

/// Rules for `check`: the email preset when a user name is given, plus any literal flags.
#[derive(Debug, Clone, Default)]
pub struct CheckRules {
    pub email_user: Option<String>,
    pub payment_link: String,
    pub quote: Option<String>,
    pub step_text: Option<String>,
    pub exactly_once: Vec<String>,
    pub at_least_once: Vec<String>,
    pub forbid: Vec<String>,
}

impl CheckRules {
    pub fn build(&self) -> ValidationRuleSet {
        let base = match &self.email_user {
            Some(user) => {
                let mut preset = EmailRules::new(user, &self.payment_link);
                preset.quote = self.quote.clone();
                preset.step_text = self.step_text.clone();
                preset.build()
            }
            None => ValidationRuleSet::new(),
        };
        base.exactly_once(self.exactly_once.iter().cloned())
            .at_least_once(self.at_least_once.iter().cloned())
            .forbid(self.forbid.iter().cloned())
    }
}

/// Validates `text` offline. A violation is an unsuccessful report, not an error.
pub fn check(text: &str, rules: &CheckRules) -> Report {
    let cleaned = coach::strip_delimiters(text);
    match rules.build().validate(&cleaned) {
        Ok(()) => Report::ok("ok", json!({ "valid": true })),
        Err(v) => Report {
            text: format!("invalid: {}", v),
            json: json!({ "valid": false, "reason": v.to_string() }),
            success: false,
        },
    }
}

pub fn chunk(text: &str, splitter: &TextSplitter) -> Report {
    let chunks = splitter.split(text);
    let text_out = chunks
        .iter()
        .map(|c| format!("[{}..{}] {}", c.start_offset, c.end_offset, c.content))
        .collect::<Vec<_>>()
        .join("\n");
    let json = serde_json::to_value(&chunks).unwrap_or(Value::Null);
    Report::ok(text_out, json)
}

pub async fn embed(gateway: &dyn ModelGateway, text: &str) -> Result<Report, CliError> {
    let embedding = gateway.embed(text).await?;
    let json = serde_json::from_str(&embedding).unwrap_or(Value::String(embedding.clone()));
    Ok(Report::ok(embedding, json!({ "embedding": json })))
}

/// Embeds every chunk of `text` (`embed --chunks`).
pub async fn embed_chunks(gateway: &dyn ModelGateway, text: &str) -> Result<Report, CliError> {
    let embedded = coach::embed_document(gateway, text).await?;
    let text_out = embedded
        .iter()
        .map(|e| format!("[{}..{}] {}", e.chunk.start_offset, e.chunk.end_offset, e.embedding))
        .collect::<Vec<_>>()
        .join("\n");
    let json = serde_json::to_value(&embedded).unwrap_or(Value::Null);
    Ok(Report::ok(text_out, json))
}
