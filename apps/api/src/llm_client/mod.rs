/// LLM client: the single point of entry for all chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call a chat-completion API directly.
/// All LLM interactions MUST go through this module.
///
/// Speaks the OpenAI-compatible `/chat/completions` dialect, so the same code
/// drives OpenRouter (primary) and a local llama.cpp / Ollama server (fallback).
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub mod cleanup;
pub mod memo;
pub mod prompts;

use cleanup::extract_json_payload;
use memo::{MemoKey, ResponseMemo};
use prompts::JSON_ONLY_SUFFIX;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Memo size unless overridden with `with_cache_capacity`.
pub const DEFAULT_CACHE_ENTRIES: usize = 256;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    /// The provider's quota for this key is exhausted; retrying will not help.
    #[error("Daily API limit reached: {0}")]
    DailyLimit(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// One OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Short label used in logs ("openrouter", "local").
    pub label: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Endpoint {
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice, if it is non-empty.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// The single LLM client shared by all services.
/// Wraps chat completions with retry logic, a response memo, an optional local
/// fallback endpoint, and structured-output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    primary: Endpoint,
    fallback: Option<Endpoint>,
    cache: Arc<RwLock<ResponseMemo>>,
    backoff_base: Duration,
}

impl LlmClient {
    pub fn new(primary: Endpoint, fallback: Option<Endpoint>) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            primary,
            fallback,
            cache: Arc::new(RwLock::new(ResponseMemo::new(DEFAULT_CACHE_ENTRIES))),
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Replaces the memo with an empty one holding at most `entries` replies.
    pub fn with_cache_capacity(mut self, entries: usize) -> Self {
        self.cache = Arc::new(RwLock::new(ResponseMemo::new(entries)));
        self
    }

    /// Overrides the first retry delay (doubles on each further attempt).
    #[cfg(test)]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn model(&self) -> &str {
        &self.primary.model
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Sends a system + user prompt and returns the reply text.
    ///
    /// Successful replies are memoised by `(system, prompt, max_tokens)` in a
    /// bounded memo that evicts the oldest reply first.
    /// If the primary endpoint fails and a fallback is configured, the request
    /// is sent once to the fallback; the primary error is returned if both fail.
    pub async fn call(&self, system: &str, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let key: MemoKey = (system.to_string(), prompt.to_string(), max_tokens);
        if let Some(hit) = self.cache.read().await.get(&key) {
            debug!("LLM cache hit ({} chars)", hit.len());
            return Ok(hit.clone());
        }

        let result = match self.call_endpoint(&self.primary, system, prompt, max_tokens).await {
            Ok(text) => Ok(text),
            Err(primary_err) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        "{} call failed ({primary_err}), trying {} fallback",
                        self.primary.label, fallback.label
                    );
                    self.call_endpoint(fallback, system, prompt, max_tokens)
                        .await
                        .map_err(|fallback_err| {
                            warn!("{} fallback failed: {fallback_err}", fallback.label);
                            primary_err
                        })
                }
                None => Err(primary_err),
            },
        };

        if let Ok(text) = &result {
            self.cache.write().await.insert(key, text.clone());
        }
        result
    }

    /// Calls the LLM and deserializes the reply as JSON.
    /// Prose or code fences around the JSON payload are tolerated.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<T, LlmError> {
        let prompt = format!("{prompt}\n\n{JSON_ONLY_SUFFIX}");
        let text = self.call(system, &prompt, max_tokens).await?;
        serde_json::from_str(extract_json_payload(&text)).map_err(LlmError::Parse)
    }

    /// Retries on transport errors, 429 and 5xx with exponential backoff.
    async fn call_endpoint(
        &self,
        endpoint: &Endpoint,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &endpoint.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.backoff_base * (1 << (attempt - 1));
                warn!(
                    "{} call attempt {} failed, retrying after {}ms...",
                    endpoint.label,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .post(endpoint.completions_url())
                .header("content-type", "application/json")
                .json(&request_body);
            if let Some(key) = &endpoint.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                let message = api_error_message(&body);
                if message.to_lowercase().contains("rate limit") {
                    return Err(LlmError::DailyLimit(message));
                }
                warn!("{} returned 429: {}", endpoint.label, body);
                last_error = Some(LlmError::Api {
                    status: 429,
                    message,
                });
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("{} returned {}: {}", endpoint.label, status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: api_error_message(&body),
                });
            }

            let chat: ChatResponse = response.json().await?;
            let usage = chat.usage.as_ref();
            debug!(
                "{} call succeeded: prompt_tokens={}, completion_tokens={}",
                endpoint.label,
                usage.map(|u| u.prompt_tokens).unwrap_or_default(),
                usage.map(|u| u.completion_tokens).unwrap_or_default()
            );

            return chat
                .text()
                .map(str::to_string)
                .ok_or(LlmError::EmptyContent);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Pulls `error.message` out of a provider error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}


#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::test_support::{client, endpoint, reply};
    use super::*;

    #[tokio::test]
    async fn test_call_returns_first_choice_and_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_string_contains("\"model\":\"test-model\""))
            .respond_with(reply("Data Scientist"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server.uri()).call("sys", "user", 50).await.unwrap();
        assert_eq!(text, "Data Scientist");
    }

    #[tokio::test]
    async fn test_identical_calls_are_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("cached"))
            .expect(1)
            .mount(&server)
            .await;

        let llm = client(&server.uri());
        assert_eq!(llm.call("sys", "same", 10).await.unwrap(), "cached");
        assert_eq!(llm.call("sys", "same", 10).await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_cache_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("ok"))
            .expect(4)
            .mount(&server)
            .await;

        let llm = client(&server.uri()).with_cache_capacity(2);
        for prompt in ["one", "two", "three"] {
            llm.call("sys", prompt, 10).await.unwrap();
        }
        assert_eq!(llm.cache.read().await.len(), 2);

        // "one" was evicted, so it goes back to the server
        llm.call("sys", "one", 10).await.unwrap();
        llm.call("sys", "three", 10).await.unwrap();
    }

    #[tokio::test]
    async fn test_plain_429_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Provider is busy, slow down"}
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(reply("after backoff"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server.uri()).call("sys", "busy", 10).await.unwrap();
        assert_eq!(text, "after backoff");
    }

    #[tokio::test]
    async fn test_persistent_429_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("overloaded"))
            .expect(u64::from(MAX_RETRIES))
            .mount(&server)
            .await;

        let err = client(&server.uri()).call("sys", "busy", 10).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_transport_error_is_retried_then_falls_back() {
        // Bind then drop a listener so the port is closed.
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_url = format!("http://{}", closed.local_addr().unwrap());
        drop(closed);

        let local = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("served locally"))
            .expect(1)
            .mount(&local)
            .await;

        let llm = LlmClient::new(
            endpoint(&dead_url, "openrouter"),
            Some(endpoint(&local.uri(), "local")),
        )
        .unwrap()
        .with_backoff_base(Duration::from_millis(1));

        assert_eq!(llm.call("sys", "offline", 10).await.unwrap(), "served locally");
    }

    #[tokio::test]
    async fn test_transport_error_without_fallback_is_http_error() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_url = format!("http://{}", closed.local_addr().unwrap());
        drop(closed);

        let err = client(&dead_url).call("sys", "offline", 10).await.unwrap_err();
        assert!(matches!(err, LlmError::Http(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(reply("recovered"))
            .mount(&server)
            .await;

        let text = client(&server.uri()).call("sys", "retry", 10).await.unwrap();
        assert_eq!(text, "recovered");
    }

    #[tokio::test]
    async fn test_daily_limit_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit exceeded: free-models-per-day"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri()).call("sys", "quota", 10).await.unwrap_err();
        assert!(matches!(err, LlmError::DailyLimit(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried_and_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "No auth credentials found"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let llm = client(&server.uri());
        for _ in 0..2 {
            match llm.call("sys", "auth", 10).await {
                Err(LlmError::Api { status, message }) => {
                    assert_eq!(status, 401);
                    assert_eq!(message, "No auth credentials found");
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server.uri()).call("sys", "empty", 10).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_fallback_endpoint_used_when_primary_fails() {
        let primary = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&primary)
            .await;
        let local = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("from local model"))
            .expect(1)
            .mount(&local)
            .await;

        let llm = LlmClient::new(
            endpoint(&primary.uri(), "openrouter"),
            Some(endpoint(&local.uri(), "local")),
        )
        .unwrap()
        .with_backoff_base(Duration::from_millis(1));

        assert!(llm.has_fallback());
        assert_eq!(llm.call("sys", "x", 10).await.unwrap(), "from local model");
    }

    #[tokio::test]
    async fn test_call_json_tolerates_prose_and_appends_instruction() {
        #[derive(Debug, Deserialize)]
        struct Title {
            job_title: String,
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Respond with valid JSON only"))
            .respond_with(reply("Sure thing:\n```json\n{\"job_title\": \"SRE\"}\n```"))
            .mount(&server)
            .await;

        let parsed: Title = client(&server.uri())
            .call_json("sys", "give me a title", 50)
            .await
            .unwrap();
        assert_eq!(parsed.job_title, "SRE");
    }
}
