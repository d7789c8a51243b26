//! Bounded generate-and-validate loop.
//!
//! [`RetryOrchestrator::run`] renders the prompt once, then drives
//! gateway → validator through [`AttemptState`] until the output passes or
//! [`MAX_ATTEMPTS`] attempts have failed. Every attempt sends the identical message list.
//! On exhaustion an operator alert is sent best-effort and
//! [`CoachError::MaxAttemptsExceeded`] is returned.
//!
//! Only validation failures are retried. Template and gateway errors end the run at once.

use std::sync::Arc;

use crate::error::CoachError;
use crate::llm::ModelGateway;
use crate::message::ChatMessage;
use crate::notify::{Notifier, OperatorAlert};
use crate::prompts::{TaskPrompt, TemplateError};
use crate::validate::{strip_delimiters, ValidationRuleSet, Violation};

/// Hard ceiling on model calls per run.
pub const MAX_ATTEMPTS: u32 = 3;

/// Loop state. Starts at `Attempting(1)`; `Succeeded` and `Failed` are terminal.
#[derive(Debug)]
pub enum AttemptState {
    Attempting(u32),
    Succeeded(String),
    Failed(CoachError),
}

/// What to send to the model: messages as-is, or a task prompt rendered into one human
/// message.
#[derive(Debug, Clone)]
pub enum PromptInput<'a> {
    Messages(Vec<ChatMessage>),
    Template {
        prompt: &'a TaskPrompt,
        internal_data: Option<&'a str>,
        external_data: Option<&'a str>,
    },
}

impl<'a> PromptInput<'a> {
    pub fn template(
        prompt: &'a TaskPrompt,
        internal_data: Option<&'a str>,
        external_data: Option<&'a str>,
    ) -> Self {
        PromptInput::Template {
            prompt,
            internal_data,
            external_data,
        }
    }

    /// Message list sent on every attempt.
    pub fn into_messages(self) -> Result<Vec<ChatMessage>, TemplateError> {
        match self {
            PromptInput::Messages(messages) => Ok(messages),
            PromptInput::Template {
                prompt,
                internal_data,
                external_data,
            } => Ok(vec![ChatMessage::human(
                prompt.render(internal_data, external_data)?,
            )]),
        }
    }
}

/// One model call and its verdict. Lives for a single loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAttempt<'a> {
    /// 1-based.
    pub attempt: u32,
    pub prompt: &'a [ChatMessage],
    pub raw_output: String,
    /// `raw_output` with delimiters stripped; this is what was validated.
    pub cleaned_output: String,
    pub verdict: Result<(), Violation>,
}

impl<'a> GenerationAttempt<'a> {
    pub fn judge(
        attempt: u32,
        prompt: &'a [ChatMessage],
        raw_output: String,
        rules: &ValidationRuleSet,
    ) -> Self {
        let cleaned_output = strip_delimiters(&raw_output);
        let verdict = rules.validate(&cleaned_output);
        Self {
            attempt,
            prompt,
            raw_output,
            cleaned_output,
            verdict,
        }
    }
}

/// Runs validated generation with injected gateway and notifier.
///
/// **Interaction**: Used by [`crate::tasks::compose_email`]; calls
/// [`ModelGateway::complete`], [`crate::validate::validate`] and [`Notifier::send`].
pub struct RetryOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    notifier: Arc<dyn Notifier>,
    alert: OperatorAlert,
}

impl RetryOrchestrator {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        notifier: Arc<dyn Notifier>,
        alert: OperatorAlert,
    ) -> Self {
        Self {
            gateway,
            notifier,
            alert,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn ModelGateway> {
        &self.gateway
    }

    pub fn alert(&self) -> &OperatorAlert {
        &self.alert
    }

    /// Generates text that passes `rules`, returning the delimiter-stripped output.
    pub async fn run(
        &self,
        prompt: PromptInput<'_>,
        rules: &ValidationRuleSet,
    ) -> Result<String, CoachError> {
        let messages = prompt.into_messages()?;
        let mut state = AttemptState::Attempting(1);
        loop {
            state = match state {
                AttemptState::Attempting(n) => self.step(n, &messages, rules).await,
                AttemptState::Succeeded(text) => return Ok(text),
                AttemptState::Failed(err) => return Err(err),
            };
        }
    }

    async fn step(
        &self,
        n: u32,
        messages: &[ChatMessage],
        rules: &ValidationRuleSet,
    ) -> AttemptState {
        let raw = match self.gateway.complete(messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(attempt = n, error = %e, component = %self.alert.component, "model call failed");
                return AttemptState::Failed(e.into());
            }
        };

        let attempt = GenerationAttempt::judge(n, messages, raw, rules);
        tracing::trace!(attempt = n, raw = %attempt.raw_output, "model output");
        match attempt.verdict {
            Ok(()) => {
                tracing::debug!(attempt = n, component = %self.alert.component, "output accepted");
                AttemptState::Succeeded(attempt.cleaned_output)
            }
            Err(reason) if n < MAX_ATTEMPTS => {
                tracing::warn!(attempt = n, reason = %reason, component = %self.alert.component, "output rejected, retrying");
                AttemptState::Attempting(n + 1)
            }
            Err(reason) => {
                let err = CoachError::MaxAttemptsExceeded {
                    attempts: n,
                    reason,
                };
                tracing::error!(attempts = n, error = %err, component = %self.alert.component, "giving up");
                self.notify_operator(&err).await;
                AttemptState::Failed(err)
            }
        }
    }

    async fn notify_operator(&self, err: &CoachError) {
        let notification = self.alert.notification(&err.to_string());
        if let Err(e) = self.notifier.send(&notification).await {
            tracing::error!(error = %e, to = %notification.to, "operator alert failed");
        }
    }
}
