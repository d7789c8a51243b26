//! Model gateway: chat completion, embeddings and chunking behind one trait.
//!
//! The retry orchestrator and the task helpers depend on [`ModelGateway`] only; the
//! concrete client ([`OpenAiGateway`] or [`MockGateway`]) is injected by the caller.
//! Gateways never retry: a transport or API failure is returned as [`GatewayError`]
//! and aborts the current attempt.

mod chunk;
mod mock;
mod openai;

pub use chunk::{Chunk, SplitError, TextSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use mock::{MockGateway, MockReply};
pub use openai::{OpenAiGateway, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL};

use async_trait::async_trait;
use thiserror::Error;

use crate::message::ChatMessage;

/// Transport or remote API failure. Propagated unmodified to the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model gateway request build failed: {0}")]
    Build(String),
    #[error("model gateway API error: {0}")]
    Api(String),
    #[error("model gateway returned no choices")]
    NoChoices,
    #[error("model gateway returned no embedding")]
    NoEmbedding,
    #[error("embedding serialization failed: {0}")]
    Serialize(String),
}

/// A function the model may call instead of answering in prose.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: Option<String>,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// Function call returned by the model: name plus raw JSON argument string.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Token usage for one completion.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModelUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Generated text plus an optional structured function-call payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelResponse {
    pub content: String,
    pub function_call: Option<FunctionCall>,
    pub usage: Option<ModelUsage>,
}

impl ModelResponse {
    /// Text-only response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Serializes an embedding vector to the stable JSON array form used as a literal
/// similarity-search parameter, e.g. `[0.1,0.2,0.3]`.
pub fn serialize_embedding(vector: &[f32]) -> Result<String, GatewayError> {
    serde_json::to_string(vector).map_err(|e| GatewayError::Serialize(e.to_string()))
}

/// LLM gateway: completions, embeddings and the chunking policy used before embedding.
///
/// **Interaction**: Used by [`crate::retry::RetryOrchestrator`], [`crate::tasks`] and
/// [`crate::ingest`].
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// One completion over `messages` (turn order preserved). When `function` is set the
    /// model is asked to answer through that function.
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        function: Option<&FunctionSpec>,
    ) -> Result<ModelResponse, GatewayError>;

    /// Embedding vector for `text`.
    async fn embed_vector(&self, text: &str) -> Result<Vec<f32>, GatewayError>;

    /// Splitting policy applied by [`ModelGateway::chunk`].
    fn splitter(&self) -> &TextSplitter;

    /// Plain-text completion.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GatewayError> {
        Ok(self.invoke(messages, None).await?.content)
    }

    /// Embedding serialized with [`serialize_embedding`].
    async fn embed(&self, text: &str) -> Result<String, GatewayError> {
        let vector = self.embed_vector(text).await?;
        serialize_embedding(&vector)
    }

    /// Overlapping windows of `text` for embedding.
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.splitter().split(text)
    }
}
