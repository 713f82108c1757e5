//! Streaming chat provider
//!
//! The production implementation speaks the Anthropic Messages API with
//! SSE streaming; a mock provider streams a canned answer for tests and
//! keyless development. Both forward incremental text through an mpsc
//! sender and return the assembled answer.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use repomind_config::LlmConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{RagError, RagResult};

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// One generation request: the assembled prompt pair
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Capability for streaming chat generation
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stream the answer, forwarding each text delta through `tokens`
    ///
    /// Returns the full answer on completion. Cancellation aborts the
    /// in-flight stream and discards the partial answer.
    ///
    /// # Errors
    ///
    /// Upstream failures mapped per the shared taxonomy; `Cancelled`
    /// when the token fires mid-stream.
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        tokens: mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> RagResult<String>;

    /// Model identifier, surfaced in response metadata
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Messages-API chat provider with SSE streaming
pub struct AnthropicChat {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicChat {
    /// Build a provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error when no API key is configured or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &LlmConfig) -> RagResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| RagError::Unauthorized("LLM_API_KEY is not set".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RagError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key,
            model: config.model_id.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Split one SSE line into its field and value
    fn parse_sse_line(line: &str) -> Option<(&'static str, &str)> {
        if let Some(value) = line.strip_prefix("event: ") {
            Some(("event", value.trim()))
        } else if let Some(value) = line.strip_prefix("data: ") {
            Some(("data", value.trim()))
        } else {
            None
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicChat {
    #[tracing::instrument(skip(self, request, tokens, cancel), fields(model = %self.model))]
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        tokens: mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> RagResult<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &request.system_prompt,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.user_prompt,
            }],
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }

        let mut answer = String::new();
        let mut buffer = String::new();
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => return Err(RagError::Cancelled),
                next = stream.next() => next,
            };

            let Some(piece) = next else { break };
            let piece = piece.map_err(|e| RagError::Http(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&piece));

            // SSE messages end with a blank line; anything after the
            // last one stays buffered for the next network chunk
            while let Some(end) = buffer.find("\n\n") {
                let message: String = buffer.drain(..end + 2).collect();
                for line in message.lines() {
                    let Some(("data", data)) = Self::parse_sse_line(line) else {
                        continue;
                    };
                    let Ok(payload) = serde_json::from_str::<StreamPayload>(data) else {
                        continue;
                    };
                    if payload.kind == "content_block_delta"
                        && let Some(delta) = payload.delta
                        && delta.kind.as_deref() == Some("text_delta")
                        && let Some(text) = delta.text
                    {
                        answer.push_str(&text);
                        if tokens.send(text).await.is_err() {
                            // Receiver gone: the caller aborted
                            return Err(RagError::Cancelled);
                        }
                    }
                }
            }
        }

        if answer.is_empty() {
            return Err(RagError::Decode("stream carried no text deltas".to_string()));
        }
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn classify_status(status: StatusCode, detail: &str) -> RagError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RagError::Unauthorized(detail.to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => RagError::RateLimited,
        s if s.is_server_error() => RagError::Upstream(format!("status {s}: {detail}")),
        s => RagError::Decode(format!("status {s}: {detail}")),
    }
}

/// Canned-answer provider for tests and keyless development
pub struct MockChat {
    answer: String,
}

impl MockChat {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
        }
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new("The provided excerpts describe the requested behavior [1].")
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn stream_chat(
        &self,
        _request: &ChatRequest,
        tokens: mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> RagResult<String> {
        // Stream word by word so callers exercise real token handling
        for word in self.answer.split_inclusive(' ') {
            if cancel.is_cancelled() {
                return Err(RagError::Cancelled);
            }
            if tokens.send(word.to_string()).await.is_err() {
                return Err(RagError::Cancelled);
            }
        }
        Ok(self.answer.clone())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body() -> String {
        [
            r#"event: message_start
data: {"type":"message_start"}

"#,
            r#"event: content_block_delta
data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"The login flow "}}

"#,
            r#"event: content_block_delta
data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"lives in auth.rs [1]."}}

"#,
            r#"event: message_stop
data: {"type":"message_stop"}

"#,
        ]
        .concat()
    }

    fn provider_for(server: &MockServer) -> AnthropicChat {
        AnthropicChat::new(&LlmConfig {
            api_key: Some("test-key".to_string()),
            api_base: server.uri(),
            model_id: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn streams_deltas_and_returns_full_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body()),
            )
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::channel(16);
        let answer = provider_for(&server)
            .stream_chat(
                &ChatRequest {
                    system_prompt: "system".to_string(),
                    user_prompt: "where is login handled?".to_string(),
                },
                tx,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(answer, "The login flow lives in auth.rs [1].");

        let mut streamed = String::new();
        while let Ok(token) = rx.try_recv() {
            streamed.push_str(&token);
        }
        assert_eq!(streamed, answer, "tokens add up to the final answer");
    }

    #[tokio::test]
    async fn auth_failure_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (tx, _rx) = mpsc::channel(16);
        let err = provider_for(&server)
            .stream_chat(
                &ChatRequest {
                    system_prompt: String::new(),
                    user_prompt: "q".to_string(),
                },
                tx,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn pre_cancelled_token_aborts_the_mock_stream() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (tx, _rx) = mpsc::channel(16);
        let err = MockChat::default()
            .stream_chat(
                &ChatRequest {
                    system_prompt: String::new(),
                    user_prompt: "q".to_string(),
                },
                tx,
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Cancelled));
    }
}
