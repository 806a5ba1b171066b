//! Provider trait: the abstraction over remote chat-completion backends.
//!
//! A Provider knows how to send an assembled message list to an LLM and
//! hand back the reply as a lazy stream of text fragments.
//!
//! Implementations: OpenAI-compatible endpoints (OpenRouter, OpenAI, Ollama).

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// A single-pass, pull-based sequence of reply fragments.
///
/// Items arrive in wire order. A transport failure is delivered as one
/// terminal `Err` item; the stream yields nothing after it.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "deepseek/deepseek-chat-v3-0324:free")
    pub model: String,

    /// The budgeted message list, system message first
    pub messages: Vec<Message>,

    /// Sampling temperature; omitted from the wire when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate; omitted from the wire when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// The core Provider trait.
///
/// The session calls `stream()` without knowing which backend is behind
/// it. Retries are not attempted at this layer.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a stream of reply fragments.
    ///
    /// Errors returned here happen before the first byte of the body
    /// (connection refused, non-2xx status). Failures after that point
    /// arrive through the stream itself.
    async fn stream(&self, request: ProviderRequest) -> Result<FragmentStream, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
