//! Task compositions used by request handlers: email, plan, chat reply and summary.
//!
//! Each task looks up its template in a [`PromptCatalog`], renders it and calls the model.
//! Only [`compose_email`] validates its output (through [`RetryOrchestrator`]); the others
//! return the delimiter-stripped text or the extracted plan.

use serde::{Deserialize, Serialize};

use crate::error::CoachError;
use crate::llm::ModelGateway;
use crate::message::ChatMessage;
use crate::plan::{extract, plan_function, PlanExtraction, PLAN_FUNCTION_NAME};
use crate::prompts::PromptCatalog;
use crate::retry::{PromptInput, RetryOrchestrator};
use crate::validate::{strip_delimiters, EmailRules};

pub const EMAIL_TEMPLATE: &str = "email";
pub const PLAN_TEMPLATE: &str = "plan";
pub const CHAT_TEMPLATE: &str = "chat";
pub const SUMMARY_TEMPLATE: &str = "summary";

/// Values for one coaching email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub user_name: String,
    pub payment_link: String,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub step_text: Option<String>,
    /// Free text about the client (goals, situation).
    #[serde(default)]
    pub about: String,
}

impl EmailRequest {
    /// Internal data block: the values the email must carry.
    fn details(&self) -> String {
        let mut lines = vec![
            format!("Client name: {}", self.user_name),
            format!("Payment link: {}", self.payment_link),
        ];
        if let Some(quote) = &self.quote {
            lines.push(format!("Quote: {}", quote));
        }
        if let Some(step) = &self.step_text {
            lines.push(format!("Next step: {}", step));
        }
        lines.join("\n")
    }

    pub fn rules(&self) -> EmailRules {
        let mut rules = EmailRules::new(&self.user_name, &self.payment_link);
        rules.quote = self.quote.clone();
        rules.step_text = self.step_text.clone();
        rules
    }
}

/// Renders the `email` template and generates a validated HTML email.
pub async fn compose_email(
    orchestrator: &RetryOrchestrator,
    catalog: &PromptCatalog,
    request: &EmailRequest,
) -> Result<String, CoachError> {
    let prompt = catalog.get(EMAIL_TEMPLATE)?;
    let details = request.details();
    let rules = request.rules().build();
    tracing::debug!(user = %request.user_name, "composing email");
    orchestrator
        .run(
            PromptInput::template(prompt, Some(details.as_str()), Some(request.about.as_str())),
            &rules,
        )
        .await
}

/// Client message plus the current plan, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    /// Current plan or coaching notes; rendered as the internal block.
    #[serde(default)]
    pub current_plan: Option<String>,
    pub message: String,
}

/// Asks the model to answer through the plan function and extracts the result.
///
/// A reply without a function call is a summary-only result whose summary is the
/// assistant text. A function call whose arguments do not parse is
/// [`CoachError::MalformedStructuredOutput`].
pub async fn propose_plan(
    gateway: &dyn ModelGateway,
    catalog: &PromptCatalog,
    request: &PlanRequest,
) -> Result<PlanExtraction, CoachError> {
    let prompt = catalog.get(PLAN_TEMPLATE)?;
    let rendered = prompt.render(
        Some(request.current_plan.as_deref().unwrap_or("No plan yet.")),
        Some(request.message.as_str()),
    )?;
    let function = plan_function();
    let response = gateway
        .invoke(&[ChatMessage::human(rendered)], Some(&function))
        .await?;

    match response.function_call {
        Some(call) if call.name == PLAN_FUNCTION_NAME => Ok(extract(&call.arguments)?),
        Some(call) => {
            tracing::warn!(function = %call.name, "unexpected function call, using text reply");
            Ok(PlanExtraction::summary_only(strip_delimiters(
                &response.content,
            )))
        }
        None => Ok(PlanExtraction::summary_only(strip_delimiters(
            &response.content,
        ))),
    }
}

/// One chat turn: retrieved context, prior turns and the new message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub message: String,
}

/// Message list for a chat turn: rendered system prompt, history in order, new message.
pub fn chat_messages(
    catalog: &PromptCatalog,
    request: &ChatRequest,
) -> Result<Vec<ChatMessage>, CoachError> {
    let system = catalog
        .get(CHAT_TEMPLATE)?
        .render(Some(request.context.as_str()), None)?;
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(request.history.iter().cloned());
    messages.push(ChatMessage::human(&request.message));
    Ok(messages)
}

/// Assistant reply for a chat turn, delimiter-stripped.
pub async fn chat_reply(
    gateway: &dyn ModelGateway,
    catalog: &PromptCatalog,
    request: &ChatRequest,
) -> Result<String, CoachError> {
    let messages = chat_messages(catalog, request)?;
    let reply = gateway.complete(&messages).await?;
    Ok(strip_delimiters(&reply))
}

/// Short summary of `text` (e.g. an ingested page).
pub async fn summarize(
    gateway: &dyn ModelGateway,
    catalog: &PromptCatalog,
    text: &str,
) -> Result<String, CoachError> {
    let rendered = catalog.get(SUMMARY_TEMPLATE)?.render(None, Some(text))?;
    let reply = gateway.complete(&[ChatMessage::human(rendered)]).await?;
    Ok(strip_delimiters(&reply))
}
