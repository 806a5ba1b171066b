//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenRouter, OpenAI, Ollama, vLLM, Together AI, and any
//! endpoint exposing `POST /chat/completions` with SSE streaming.
//!
//! Each request carries `{model, messages, stream: true}` (plus optional
//! `temperature` / `max_tokens`) and a bearer token. The response body is
//! handed to [`crate::sse::decode_stream`] unread, so bytes are only pulled
//! off the socket as the caller consumes fragments.

use std::time::Duration;

use async_trait::async_trait;
use personachat_config::AppConfig;
use personachat_core::error::ProviderError;
use personachat_core::message::Message;
use personachat_core::provider::{FragmentStream, ProviderRequest};
use serde::Serialize;
use tracing::{debug, warn};

use crate::sse::decode_stream;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// An OpenAI-compatible streaming chat provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_timeout(name, base_url, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a provider with an explicit overall request timeout.
    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build configured HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Build the provider described by the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;

        Ok(Self::with_timeout(
            config.provider.clone(),
            config.base_url.clone(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message types to the wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect()
    }

    /// Build the JSON request body.
    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": true,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn map_send_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl personachat_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: ProviderRequest) -> Result<FragmentStream, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(decode_stream(response.bytes_stream()))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use personachat_core::Provider;

    #[test]
    fn openrouter_constructor() {
        let provider = OpenAiCompatProvider::openrouter("sk-test");
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None);
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url.contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("custom", "http://localhost:8080/v1/", "k");
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn from_config_requires_key() {
        let config = AppConfig::default();
        let err = OpenAiCompatProvider::from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        let config = AppConfig {
            api_key: Some("sk-or-test".into()),
            base_url: "https://example.test/api/v1/".into(),
            ..AppConfig::default()
        };
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.base_url(), "https://example.test/api/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi!"),
        ];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 3);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[2].role, "assistant");
        assert_eq!(api_messages[2].content, "Hi!");
    }

    #[test]
    fn request_body_shape() {
        let req = ProviderRequest::new("deepseek/deepseek-chat", vec![Message::user("Hello")]);
        let body = OpenAiCompatProvider::request_body(&req);
        assert_eq!(body["model"], "deepseek/deepseek-chat");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        // Internal fields never reach the wire.
        assert!(body["messages"][0].get("id").is_none());
    }

    #[test]
    fn request_body_optional_fields() {
        let mut req = ProviderRequest::new("m", vec![]);
        req.temperature = Some(0.5);
        req.max_tokens = Some(256);
        let body = OpenAiCompatProvider::request_body(&req);
        assert_eq!(body["max_tokens"], 256);
        assert!((body["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        // Port 9 (discard) on localhost is almost never listening.
        let provider = OpenAiCompatProvider::new("dead", "http://127.0.0.1:9/v1", "k");
        let err = provider
            .stream(ProviderRequest::new("m", vec![Message::user("hi")]))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ProviderError::Network(_) | ProviderError::Timeout(_)
        ));
    }
}
