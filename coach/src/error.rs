//! Crate-level error type for generation pipelines.
//!
//! Module errors ([`TemplateError`], [`GatewayError`], [`ExtractError`]) convert into
//! [`CoachError`] with `?`. Validation failures never surface on their own: the retry
//! orchestrator recovers them locally and only reports the last one inside
//! [`CoachError::MaxAttemptsExceeded`].

use thiserror::Error;

use crate::llm::GatewayError;
use crate::plan::ExtractError;
use crate::prompts::TemplateError;
use crate::validate::Violation;

/// Error returned by orchestrated generation and task helpers.
#[derive(Debug, Error)]
pub enum CoachError {
    /// A template slot had no value, or the template itself is malformed. Not retried.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Transport or remote API failure from the model gateway. Aborts the current attempt.
    #[error(transparent)]
    ModelGateway(#[from] GatewayError),

    /// Every attempt produced output that failed validation.
    #[error("max attempts exceeded after {attempts} attempts: {reason}")]
    MaxAttemptsExceeded { attempts: u32, reason: Violation },

    /// Structured function-call output could not be turned into a plan.
    #[error(transparent)]
    MalformedStructuredOutput(#[from] ExtractError),
}
