//! OpenAI implementation of [`ModelGateway`]: chat completions and embeddings.
//!
//! Uses `OPENAI_API_KEY` (and `OPENAI_BASE_URL` when set) by default, or an explicit
//! [`OpenAIConfig`]. When a [`FunctionSpec`] is given it is sent as the only tool with
//! tool choice `required`; the first function tool call in the reply becomes
//! [`ModelResponse::function_call`].
//!
//! The client never retries: async-openai's backoff is capped at zero elapsed time, so a
//! 5xx or 429 reply surfaces after one request as [`GatewayError::Api`].

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCalls, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage, ChatCompletionTool,
        ChatCompletionToolChoiceOption, ChatCompletionTools, CreateChatCompletionRequestArgs,
        FunctionObject, ToolChoiceOptions,
    },
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;
use tracing::{debug, trace};

use crate::llm::{
    FunctionCall, FunctionSpec, GatewayError, ModelGateway, ModelResponse, ModelUsage,
    TextSplitter,
};
use crate::message::ChatMessage;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Backoff that stops after the first attempt.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// OpenAI-backed gateway.
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model: String,
    embedding_model: String,
    temperature: Option<f32>,
    splitter: TextSplitter,
}

impl OpenAiGateway {
    /// Client with default config (API key from `OPENAI_API_KEY`).
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new(), model)
    }

    /// Client with custom config (e.g. custom API key or base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config).with_backoff(single_attempt()),
            model: model.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: None,
            splitter: TextSplitter::default(),
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set temperature (0–2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_to_request(messages: &[ChatMessage]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m {
                ChatMessage::System(s) => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(s.as_str()),
                ),
                ChatMessage::Human(s) => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(s.as_str()),
                ),
                ChatMessage::Ai(s) => ChatCompletionRequestMessage::Assistant((s.as_str()).into()),
            })
            .collect()
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        function: Option<&FunctionSpec>,
    ) -> Result<ModelResponse, GatewayError> {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages));

        if let Some(f) = function {
            args.tools(vec![ChatCompletionTools::Function(ChatCompletionTool {
                function: FunctionObject {
                    name: f.name.clone(),
                    description: f.description.clone(),
                    parameters: Some(f.parameters.clone()),
                    ..Default::default()
                },
            })]);
            args.tool_choice(ChatCompletionToolChoiceOption::Mode(
                ToolChoiceOptions::Required,
            ));
        }
        if let Some(t) = self.temperature {
            args.temperature(t);
        }

        let request = args
            .build()
            .map_err(|e| GatewayError::Build(e.to_string()))?;

        debug!(
            trace_id = %trace_id,
            model = %self.model,
            message_count = messages.len(),
            function = ?function.map(|f| f.name.as_str()),
            temperature = ?self.temperature,
            "OpenAI chat create"
        );
        if let Ok(js) = serde_json::to_string_pretty(&request) {
            trace!(trace_id = %trace_id, request = %js, "OpenAI request body");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GatewayError::Api(format!("OpenAI API error: {}", e)))?;

        if let Ok(js) = serde_json::to_string_pretty(&response) {
            trace!(trace_id = %trace_id, response = %js, "OpenAI response body");
        }

        let usage = response.usage.map(|u| ModelUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(GatewayError::NoChoices)?;

        let msg = choice.message;
        let function_call = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .find_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => Some(FunctionCall {
                    name: f.function.name,
                    arguments: f.function.arguments,
                }),
                _ => None,
            });

        debug!(
            trace_id = %trace_id,
            usage = ?usage,
            function_call = function_call.is_some(),
            "OpenAI chat complete"
        );
        Ok(ModelResponse {
            content: msg.content.unwrap_or_default(),
            function_call,
            usage,
        })
    }

    async fn embed_vector(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let request = CreateEmbeddingRequest {
            input: EmbeddingInput::String(text.to_string()),
            model: self.embedding_model.clone(),
            ..Default::default()
        };
        debug!(model = %self.embedding_model, chars = text.len(), "OpenAI embeddings create");

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| GatewayError::Api(format!("OpenAI API error: {}", e)))?;

        response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or(GatewayError::NoEmbedding)
    }

    fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_http::{read_http_request, write_http_response};
    use tokio::net::TcpListener;

    fn gateway_for(addr: std::net::SocketAddr) -> OpenAiGateway {
        let config = OpenAIConfig::new()
            .with_api_key("test-key")
            .with_api_base(format!("http://{}", addr));
        OpenAiGateway::with_config(config, "gpt-4o-mini")
    }

    fn completion_body(message: serde_json::Value) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": message, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        })
        .to_string()
    }

    #[tokio::test]
    async fn invoke_returns_content_and_usage() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_http_request(&mut stream).await;
            let body = completion_body(serde_json::json!({"role": "assistant", "content": "Hi there"}));
            write_http_response(&mut stream, "200 OK", &body).await;
        });

        let gw = gateway_for(addr);
        let out = gw
            .invoke(&[ChatMessage::system("s"), ChatMessage::human("hello")], None)
            .await
            .unwrap();
        assert_eq!(out.content, "Hi there");
        assert!(out.function_call.is_none());
        assert_eq!(out.usage.unwrap().total_tokens, 7);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn invoke_sends_roles_in_order_and_function_as_tool() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_http_request(&mut stream).await;
            let body = completion_body(serde_json::json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "propose_plan", "arguments": "{\"summary\":\"ok\"}"}
                }]
            }));
            write_http_response(&mut stream, "200 OK", &body).await;
            request
        });

        let gw = gateway_for(addr);
        let spec = FunctionSpec {
            name: "propose_plan".to_string(),
            description: None,
            parameters: serde_json::json!({"type": "object"}),
        };
        let out = gw
            .invoke(
                &[
                    ChatMessage::system("s"),
                    ChatMessage::human("h"),
                    ChatMessage::ai("a"),
                ],
                Some(&spec),
            )
            .await
            .unwrap();
        let call = out.function_call.unwrap();
        assert_eq!(call.name, "propose_plan");
        assert_eq!(call.arguments, "{\"summary\":\"ok\"}");
        assert_eq!(out.content, "");

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        let roles: Vec<&str> = request["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(request["tools"][0]["function"]["name"], "propose_plan");
        assert_eq!(request["tool_choice"], "required");
    }

    #[tokio::test]
    async fn invoke_propagates_http_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_http_request(&mut stream).await;
            write_http_response(
                &mut stream,
                "400 Bad Request",
                r#"{"error":{"message":"boom","type":"invalid_request_error","param":null,"code":null}}"#,
            )
            .await;
        });

        let gw = gateway_for(addr);
        let err = gw.invoke(&[ChatMessage::human("x")], None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Api(_)));
        assert!(err.to_string().contains("OpenAI API error"));
        server.await.unwrap();
    }

    /// **Scenario**: a 500 reply is returned after one request, not retried.
    #[tokio::test]
    async fn server_error_is_not_retried() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let server = {
            let hits = Arc::clone(&hits);
            tokio::spawn(async move {
                loop {
                    let (mut stream, _) = listener.accept().await.unwrap();
                    hits.fetch_add(1, Ordering::SeqCst);
                    read_http_request(&mut stream).await;
                    write_http_response(
                        &mut stream,
                        "500 Internal Server Error",
                        r#"{"error":{"message":"down","type":"server_error","param":null,"code":null}}"#,
                    )
                    .await;
                }
            })
        };

        let gw = gateway_for(addr);
        let err = gw.invoke(&[ChatMessage::human("x")], None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Api(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        server.abort();
    }

    #[tokio::test]
    async fn embed_serializes_first_vector() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_http_request(&mut stream).await;
            let body = serde_json::json!({
                "object": "list",
                "data": [{"object": "embedding", "index": 0, "embedding": [0.5, 0.25]}],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 1, "total_tokens": 1}
            })
            .to_string();
            write_http_response(&mut stream, "200 OK", &body).await;
        });

        let gw = gateway_for(addr);
        assert_eq!(gw.embed("budget").await.unwrap(), "[0.5,0.25]");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn embed_without_data_is_no_embedding() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_http_request(&mut stream).await;
            let body = serde_json::json!({
                "object": "list",
                "data": [],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 0, "total_tokens": 0}
            })
            .to_string();
            write_http_response(&mut stream, "200 OK", &body).await;
        });

        let gw = gateway_for(addr);
        assert!(matches!(
            gw.embed_vector("x").await,
            Err(GatewayError::NoEmbedding)
        ));
        server.await.unwrap();
    }

    #[test]
    fn chunk_uses_configured_splitter() {
        let gw = OpenAiGateway::with_config(OpenAIConfig::new().with_api_key("k"), "m")
            .with_splitter(TextSplitter::new(10, 2).unwrap());
        assert_eq!(gw.splitter().chunk_size(), 10);
        assert!(gw.chunk(&"z".repeat(30)).len() > 1);
    }
}
