use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::UpstreamError;

/// Outcome of pulling reply text out of a completion response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(String),
    NotFound,
}

/// Anything that can turn source text into English.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<Extraction, UpstreamError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// The single-turn instruction sent for every translation.
pub fn translation_prompt(text: &str) -> String {
    format!("Translate to English (do not provide any explanation): {text}")
}

/// Reply text from an OpenAI-style completion body.
///
/// Uses `choices[0].message.content` when it is a string, even a blank one;
/// `choices[0].text` is only consulted when content is missing or not a
/// string. Blank results count as not found.
pub fn extract_reply(body: &Value) -> Extraction {
    let first = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first());

    let content = first
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str);

    let reply = match content {
        Some(content) => content,
        None => first
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
            .unwrap_or(""),
    };

    match reply.trim() {
        "" => Extraction::NotFound,
        text => Extraction::Found(text.to_string()),
    }
}

/// Chat-completions client for OpenRouter (or any compatible endpoint).
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a client whose requests are bounded by the configured timeout
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build completion HTTP client")?;
        Ok(Self { client, config })
    }

    fn build_request(&self, text: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: translation_prompt(text),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl Translator for LlmClient {
    async fn translate(&self, text: &str) -> Result<Extraction, UpstreamError> {
        if text.trim().is_empty() {
            return Err(UpstreamError::EmptyInput);
        }

        let request = self.build_request(text);
        let url = self.config.completions_url();

        debug!("Sending translation request to {} (model {})", url, request.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status, body });
        }

        let body: Value = response.json().await.map_err(UpstreamError::Decode)?;
        Ok(extract_reply(&body))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    #[derive(Clone)]
    struct FakeApi {
        status: StatusCode,
        reply: Value,
        seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn completions(
        State(api): State<FakeApi>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        api.seen.lock().unwrap().push((auth, body));
        (api.status, Json(api.reply.clone()))
    }

    async fn spawn_api(api: FakeApi) -> String {
        let app = Router::new()
            .route("/v1/chat/completions", post(completions))
            .with_state(api);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    async fn spawn_stalled_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold connections without ever answering.
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String) -> LlmClient {
        LlmClient::new(LlmConfig {
            api_key: "sk-or-test".to_string(),
            base_url,
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_extract_message_content() {
        let body = json!({"choices": [{"message": {"content": "  Hello\n"}}]});
        assert_eq!(extract_reply(&body), Extraction::Found("Hello".to_string()));
    }

    #[test]
    fn test_extract_falls_back_to_text() {
        let body = json!({"choices": [{"text": "Good morning"}]});
        assert_eq!(
            extract_reply(&body),
            Extraction::Found("Good morning".to_string())
        );
    }

    #[test]
    fn test_extract_blank_content_is_not_found() {
        let body = json!({"choices": [{"message": {"content": "   "}, "text": "Hi"}]});
        assert_eq!(extract_reply(&body), Extraction::NotFound);
    }

    #[test]
    fn test_extract_null_content_falls_back_to_text() {
        let body = json!({"choices": [{"message": {"content": null}, "text": " Hi "}]});
        assert_eq!(extract_reply(&body), Extraction::Found("Hi".to_string()));
    }

    #[test]
    fn test_extract_wrong_types_are_not_found() {
        let body = json!({"choices": [{"message": {"content": 42}, "text": ["x"]}]});
        assert_eq!(extract_reply(&body), Extraction::NotFound);
    }

    #[test]
    fn test_extract_empty_or_missing_choices() {
        assert_eq!(extract_reply(&json!({"choices": []})), Extraction::NotFound);
        assert_eq!(extract_reply(&json!({"id": "gen-1"})), Extraction::NotFound);
        assert_eq!(extract_reply(&json!("nope")), Extraction::NotFound);
    }

    #[test]
    fn test_request_body_shape() {
        let client = client_for("http://unused".to_string());
        let body = serde_json::to_value(client.build_request("Hola")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "meta-llama/llama-3.2-3b-instruct:free",
                "messages": [{
                    "role": "user",
                    "content": "Translate to English (do not provide any explanation): Hola"
                }],
                "max_tokens": 1500,
                "temperature": 0.1f32
            })
        );
    }

    #[tokio::test]
    async fn test_translate_success_sends_bearer_token() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let base = spawn_api(FakeApi {
            status: StatusCode::OK,
            reply: json!({"choices": [{"message": {"role": "assistant", "content": "Hello"}}]}),
            seen: seen.clone(),
        })
        .await;

        let result = client_for(base).translate("Hola").await.unwrap();
        assert_eq!(result, Extraction::Found("Hello".to_string()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("Bearer sk-or-test"));
        assert_eq!(seen[0].1["max_tokens"], 1500);
    }

    #[tokio::test]
    async fn test_translate_no_content_is_not_an_error() {
        let base = spawn_api(FakeApi {
            status: StatusCode::OK,
            reply: json!({"choices": [{"message": {"role": "assistant", "content": null}}]}),
            seen: Arc::new(Mutex::new(Vec::new())),
        })
        .await;

        let result = client_for(base).translate("Hola").await.unwrap();
        assert_eq!(result, Extraction::NotFound);
    }

    #[tokio::test]
    async fn test_translate_error_status() {
        let base = spawn_api(FakeApi {
            status: StatusCode::TOO_MANY_REQUESTS,
            reply: json!({"error": {"message": "rate limited"}}),
            seen: Arc::new(Mutex::new(Vec::new())),
        })
        .await;

        match client_for(base).translate("Hola").await {
            Err(UpstreamError::Status { status, body }) => {
                assert_eq!(status, reqwest::StatusCode::TOO_MANY_REQUESTS);
                assert!(body.contains("rate limited"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_translate_rejects_empty_input_without_calling_api() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let base = spawn_api(FakeApi {
            status: StatusCode::OK,
            reply: json!({}),
            seen: seen.clone(),
        })
        .await;

        let result = client_for(base).translate("   ").await;
        assert!(matches!(result, Err(UpstreamError::EmptyInput)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_translate_times_out_on_stalled_api() {
        let base = spawn_stalled_server().await;
        let client = LlmClient::new(LlmConfig {
            api_key: "sk-or-test".to_string(),
            base_url: format!("{base}/v1"),
            timeout_secs: 1,
            ..LlmConfig::default()
        })
        .unwrap();

        let started = std::time::Instant::now();
        let result = client.translate("Hola").await;
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(UpstreamError::Transport(_))), "{result:?}");
        assert!(elapsed >= std::time::Duration::from_millis(900), "{elapsed:?}");
        assert!(elapsed < std::time::Duration::from_secs(5), "{elapsed:?}");
    }
}
