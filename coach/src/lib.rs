//! # Coach
//!
//! Validated LLM generation for personal finance coaching: prompts are rendered from
//! YAML templates, sent through a [`ModelGateway`], checked against literal
//! [`ValidationRuleSet`] rules and retried a bounded number of times by
//! [`RetryOrchestrator`]. Plan proposals come back as function calls and are parsed by
//! [`plan::extract`].
//!
//! ## Main modules
//!
//! - [`prompts`]: [`PromptTemplate`], [`PromptCatalog`] and the embedded YAML catalog.
//! - [`llm`]: [`ModelGateway`] trait, [`OpenAiGateway`], [`MockGateway`], [`TextSplitter`].
//! - [`validate`]: [`ValidationRuleSet`], [`Violation`], [`EmailRules`], [`strip_delimiters`].
//! - [`retry`]: [`RetryOrchestrator`], [`AttemptState`], [`MAX_ATTEMPTS`].
//! - [`plan`]: [`PlanExtraction`], [`Plan`], [`plan_function`].
//! - [`notify`]: [`Notifier`], [`ResendNotifier`], [`LogNotifier`], [`OperatorAlert`].
//! - [`tasks`]: email, plan, chat and summary compositions.
//! - [`ingest`]: chunk-and-embed for documents.
//! - [`config`]: [`CoachConfig`] read from the environment.

pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod message;
pub mod notify;
pub mod plan;
pub mod prompts;
pub mod retry;
pub mod tasks;
pub mod validate;

pub use config::{CoachConfig, ConfigError};
pub use error::CoachError;
pub use ingest::{embed_document, EmbeddedChunk};
pub use llm::{
    serialize_embedding, Chunk, FunctionCall, FunctionSpec, GatewayError, MockGateway,
    MockReply, ModelGateway, ModelResponse, ModelUsage, OpenAiGateway, TextSplitter,
};
pub use message::ChatMessage;
pub use notify::{
    LogNotifier, Notification, Notifier, NotifyError, OperatorAlert, RecordingNotifier,
    ResendNotifier,
};
pub use plan::{plan_function, Action, ExtractError, Ideas, Plan, PlanExtraction, Step};
pub use prompts::{PromptCatalog, PromptTemplate, TaskPrompt, TemplateError};
pub use retry::{AttemptState, GenerationAttempt, PromptInput, RetryOrchestrator, MAX_ATTEMPTS};
pub use tasks::{
    chat_reply, compose_email, propose_plan, summarize, ChatRequest, EmailRequest, PlanRequest,
};
pub use validate::{strip_delimiters, validate, EmailRules, ValidationRuleSet, Violation};

/// When running `cargo test -p coach`, initializes tracing from `RUST_LOG` so that unit
/// tests in `src/**` can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
