//! Chat-completions REST client
//!
//! A small client for OpenAI-compatible chat-completions endpoints with no
//! domain-specific logic. Supports tool calling with typed tools and retries
//! throttled or failed requests according to a [`RetryPolicy`].
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_client::{ChatClient, ChatMessage, ChatRequest, ToolChoice};
//!
//! let client = ChatClient::from_env()?;
//!
//! let response = client
//!     .complete(
//!         &ChatRequest::new("gpt-4o")
//!             .message(ChatMessage::system("You convert pages to markdown"))
//!             .message(ChatMessage::user("Please convert the source text"))
//!             .tool(Tool::definition(&StoreConvertedPage))
//!             .tool_choice(ToolChoice::Function("StoreConvertedPage".into())),
//!     )
//!     .await?;
//!
//! let call = response.message.last_tool_call();
//! ```

pub mod credentials;
pub mod error;
pub mod retry;
pub mod schema;
pub mod tool;
pub mod types;

pub use credentials::ApiKey;
pub use error::{ChatError, Result};
pub use retry::RetryPolicy;
pub use schema::ToolSchema;
pub use tool::{Tool, ToolCall, ToolDefinition};
pub use types::*;

use std::time::{Duration, Instant};

use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

/// Default endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default read timeout; completions of long pages are slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat-completions client.
#[derive(Clone)]
pub struct ChatClient {
    http_client: Client,
    api_key: ApiKey,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("api_key", &self.api_key)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ChatClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: ApiKey::new(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Create from `LLM_API_KEY`, falling back to `OPENAI_API_KEY`.
    ///
    /// `LLM_BASE_URL` overrides the endpoint when set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| ChatError::Config("LLM_API_KEY or OPENAI_API_KEY must be set".into()))?;

        let client = Self::new(api_key);
        Ok(match std::env::var("LLM_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => client.with_base_url(url),
            _ => client,
        })
    }

    /// Set a custom base URL (proxies, compatible gateways, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Chat completion with retries.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    let delay = self.retry.delay_for(attempt, &e);
                    warn!(
                        model = %request.model,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Chat request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if attempt > 1 && e.is_retryable() => {
                    warn!(model = %request.model, attempts = attempt, error = %e, "Chat request retries exhausted");
                    return Err(ChatError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose()),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::Timeout(self.timeout)
                } else {
                    ChatError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_text = response.text().await.unwrap_or_default();
            debug!(status = %status, error = %truncate_to_char_boundary(&error_text, 500), "Chat API error");
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: api_error_message(status, &error_text),
                retry_after,
            });
        }

        let raw: types::ChatResponseRaw = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ChatError::Timeout(self.timeout)
            } else {
                ChatError::Parse(e.to_string())
            }
        })?;

        let usage = raw.usage;
        let choice = raw
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Parse("response contained no choices".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            finish_reason = choice.finish_reason.as_deref().unwrap_or(""),
            tool_calls = choice.message.tool_calls.len(),
            total_tokens = usage.map(|u| u.total_tokens).unwrap_or(0),
            "Chat completion"
        );

        Ok(ChatResponse {
            message: choice.message,
            finish_reason: choice.finish_reason,
            usage,
        })
    }
}

fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn api_error_message(status: StatusCode, body: &str) -> String {
    // Prefer the provider's `error.message` over the raw body
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                truncate_to_char_boundary(body, 1000).to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
            .with_adaptive(false)
    }

    fn tool_call_body() -> serde_json::Value {
        json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "StoreConvertedPage",
                            "arguments": "{\"markdown_text\": \"# Title\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
    }

    #[test]
    fn test_client_builder() {
        let client = ChatClient::new("sk-test")
            .with_base_url("https://custom.api.com/v1/")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(client.base_url(), "https://custom.api.com/v1");
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(client.retry_policy().max_attempts, 10);
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let client = ChatClient::new("sk-very-secret");
        assert!(!format!("{:?}", client).contains("sk-very-secret"));
    }

    #[test]
    fn test_api_error_message_prefers_provider_message() {
        let msg = api_error_message(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"message": "model not found"}}"#,
        );
        assert_eq!(msg, "model not found");
        assert_eq!(api_error_message(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_complete_parses_tool_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header_eq("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new("sk-test").with_base_url(server.uri());
        let response = client
            .complete(&ChatRequest::new("m").message(ChatMessage::user("hi")))
            .await
            .unwrap();

        let call = response.message.last_tool_call().unwrap();
        assert_eq!(call.name, "StoreConvertedPage");
        assert_eq!(call.arguments["markdown_text"], "# Title");
        assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_complete_retries_throttling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body()))
            .mount(&server)
            .await;

        let client = ChatClient::new("k")
            .with_base_url(server.uri())
            .with_retry_policy(fast_retry(5));
        let response = client.complete(&ChatRequest::new("m")).await.unwrap();

        assert!(response.message.has_tool_calls());
    }

    #[tokio::test]
    async fn test_complete_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = ChatClient::new("k")
            .with_base_url(server.uri())
            .with_retry_policy(fast_retry(3));
        let err = client.complete(&ChatRequest::new("m")).await.unwrap_err();

        match err {
            ChatError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, ChatError::Api { status: 503, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_does_not_retry_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": {"message": "invalid tool schema"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new("k")
            .with_base_url(server.uri())
            .with_retry_policy(fast_retry(5));
        let err = client.complete(&ChatRequest::new("m")).await.unwrap_err();

        match err {
            ChatError::Api { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid tool schema");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;

        let client = ChatClient::new("k")
            .with_base_url(server.uri())
            .with_retry_policy(RetryPolicy::none());
        let err = client.complete(&ChatRequest::new("m")).await.unwrap_err();

        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
    }
}
