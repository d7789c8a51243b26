//! Scripted gateway for tests and offline runs.
//!
//! Replies are returned in order; once the script is exhausted the last reply repeats.
//! Every message list passed to [`ModelGateway::invoke`] is recorded so tests can assert
//! on call count and prompt reuse. Embeddings are a deterministic function of the input.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{FunctionCall, GatewayError, ModelGateway, ModelResponse, TextSplitter};
use crate::message::ChatMessage;

/// One scripted outcome.
#[derive(Clone, Debug)]
pub enum MockReply {
    Response(ModelResponse),
    /// Fails the call with [`GatewayError::Api`].
    Error(String),
}

/// Scripted [`ModelGateway`].
pub struct MockGateway {
    replies: Vec<MockReply>,
    calls: AtomicUsize,
    received: Mutex<Vec<Vec<ChatMessage>>>,
    splitter: TextSplitter,
    dimension: usize,
}

impl MockGateway {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            splitter: TextSplitter::default(),
            dimension: 8,
        }
    }

    /// Text-only replies in order.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|t| MockReply::Response(ModelResponse::text(t)))
                .collect(),
        )
    }

    /// Always answers through `name` with the given argument JSON.
    pub fn with_function_call(
        content: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::new(vec![MockReply::Response(ModelResponse {
            content: content.into(),
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
            usage: None,
        })])
    }

    /// Every call fails with the given API error message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![MockReply::Error(message.into())])
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Number of completion calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message lists received, in call order.
    pub fn received(&self) -> Vec<Vec<ChatMessage>> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        _function: Option<&crate::llm::FunctionSpec>,
    ) -> Result<ModelResponse, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());
        let reply = self
            .replies
            .get(n)
            .or_else(|| self.replies.last())
            .ok_or(GatewayError::NoChoices)?;
        match reply {
            MockReply::Response(r) => Ok(r.clone()),
            MockReply::Error(e) => Err(GatewayError::Api(e.clone())),
        }
    }

    async fn embed_vector(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let mut vector = vec![0u32; self.dimension];
        if self.dimension == 0 {
            return Ok(Vec::new());
        }
        for (i, b) in text.bytes().enumerate() {
            vector[i % self.dimension] += u32::from(b);
        }
        Ok(vector
            .into_iter()
            .map(|v| (v % 1000) as f32 / 1000.0)
            .collect())
    }

    fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }
}
