//! The chat session: owns the conversation and drives one turn at a time.

use std::sync::Arc;

use personachat_config::AppConfig;
use personachat_core::document::DocumentContext;
use personachat_core::error::ProviderError;
use personachat_core::message::{Conversation, Message};
use personachat_core::persona::Persona;
use personachat_core::provider::{Provider, ProviderRequest};
use personachat_providers::ReplyStream;
use tracing::{debug, info, warn};

use crate::context::{AssembledContext, AssemblyInput, ContextAssembler, ContextBudget};

/// Model parameters sent with every request.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// The model to use
    pub model: String,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Max tokens per reply
    pub max_tokens: Option<u32>,
}

impl SessionSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// One interactive chat session.
///
/// Holds everything a turn needs: the persona, the history, the uploaded
/// documents, and the provider. Nothing is persisted once it is dropped.
pub struct ChatSession {
    /// Fixed for the lifetime of the session
    persona: Persona,

    /// Every committed turn, oldest first
    conversation: Conversation,

    /// Currently uploaded documents
    documents: DocumentContext,

    assembler: ContextAssembler,

    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    settings: SessionSettings,
}

impl ChatSession {
    /// Create a new session with an empty history and no documents.
    pub fn new(
        persona: Persona,
        provider: Arc<dyn Provider>,
        settings: SessionSettings,
        budget: ContextBudget,
    ) -> Self {
        Self {
            persona,
            conversation: Conversation::new(),
            documents: DocumentContext::new(),
            assembler: ContextAssembler::new(budget),
            provider,
            settings,
        }
    }

    /// Build a session from the loaded configuration.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Self {
        let persona = Persona::load(&config.persona.source());
        info!(
            persona = %persona.name,
            source = %persona.source,
            provider = provider.name(),
            model = %config.model,
            "Starting chat session"
        );
        Self::new(
            persona,
            provider,
            SessionSettings::from_config(config),
            ContextBudget::from_config(&config.context),
        )
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn documents(&self) -> &DocumentContext {
        &self.documents
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Replace the document set wholesale.
    pub fn replace_documents(&mut self, documents: DocumentContext) {
        debug!(documents = documents.len(), "Replacing document context");
        self.documents = documents;
    }

    pub fn clear_documents(&mut self) {
        self.documents = DocumentContext::new();
    }

    /// Assemble the request context from the current state.
    pub fn assemble(&self) -> AssembledContext {
        self.assembler.assemble(&AssemblyInput {
            persona: &self.persona,
            documents: &self.documents,
            conversation: &self.conversation,
        })
    }

    /// Start a turn: record the user message and open the reply stream.
    ///
    /// The user message stays in history even if the request fails.
    pub async fn send(&mut self, text: &str) -> Result<ReplyStream, ProviderError> {
        self.conversation.push(Message::user(text));

        let context = self.assemble();
        let meta = &context.metadata;
        debug!(
            words = meta.total_words,
            budget = meta.budget,
            utilization = %format!("{:.1}%", meta.utilization_pct),
            messages = context.messages.len(),
            "Sending request"
        );
        for drop in &meta.drops {
            debug!(
                layer = %drop.layer,
                items = drop.items_dropped,
                words = drop.words_dropped,
                reason = %drop.reason,
                "Context trimmed"
            );
        }

        let mut request = ProviderRequest::new(self.settings.model.clone(), context.messages);
        request.temperature = self.settings.temperature;
        request.max_tokens = self.settings.max_tokens;

        match self.provider.stream(request).await {
            Ok(fragments) => Ok(ReplyStream::new(fragments)),
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Request failed");
                Err(e)
            }
        }
    }

    /// Finish a turn: append the reply to history if it completed.
    ///
    /// Returns the committed message, or `None` when the stream was cut
    /// short or abandoned.
    pub fn commit(&mut self, reply: ReplyStream) -> Option<&Message> {
        let partial_len = reply.partial().len();
        match reply.into_reply() {
            Some(text) => {
                self.conversation.push(Message::assistant(text));
                self.conversation.last()
            }
            None => {
                warn!(partial_bytes = partial_len, "Reply incomplete, not committed");
                None
            }
        }
    }

    /// Run one whole turn, forwarding each fragment to `on_fragment`.
    ///
    /// On a stream failure the fragments seen so far have already been
    /// forwarded, but nothing is committed.
    pub async fn ask(
        &mut self,
        text: &str,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<String, ProviderError> {
        let mut reply = self.send(text).await?;

        while let Some(fragment) = reply.next_fragment().await {
            match fragment {
                Ok(fragment) => on_fragment(&fragment),
                Err(e) => {
                    self.commit(reply);
                    return Err(e);
                }
            }
        }

        let full = reply.partial().to_string();
        self.commit(reply);
        Ok(full)
    }
}
