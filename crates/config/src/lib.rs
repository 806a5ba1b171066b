//! Configuration loading, validation, and management for PersonaChat.
//!
//! Loads configuration from `~/.personachat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use personachat_core::persona::PersonaSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.personachat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer token for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Provider name, used for logging and status output
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature; left to the provider's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens per reply; left to the provider's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Overall HTTP timeout for one streamed reply
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Context window budgeting
    #[serde(default)]
    pub context: ContextConfig,

    /// Persona source
    #[serde(default)]
    pub persona: PersonaConfig,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "deepseek/deepseek-chat-v3-0324:free".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("context", &self.context)
            .field("persona", &self.persona)
            .finish()
    }
}

/// Context assembly limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum approximate word count of one assembled request
    #[serde(default = "default_word_budget")]
    pub word_budget: usize,

    /// Fraction of the budget reserved up front for document text
    #[serde(default = "default_document_share")]
    pub document_share: f32,
}

fn default_word_budget() -> usize {
    10_000
}
fn default_document_share() -> f32 {
    0.75
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            word_budget: default_word_budget(),
            document_share: default_document_share(),
        }
    }
}

/// Where the persona prompt comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name of the persona
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Path to a persona file (markdown or plain text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Inline persona prompt (takes precedence over `file`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl PersonaConfig {
    pub fn source(&self) -> PersonaSource {
        PersonaSource {
            name: self.name.clone(),
            file: self.file.clone(),
            prompt_override: self.prompt.clone(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.personachat/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `PERSONACHAT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// The API key is only taken from the environment when the file did not
    /// set one; model and base URL always override. Variables that are
    /// exported but empty count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = lookup("PERSONACHAT_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(model) = lookup("PERSONACHAT_MODEL") {
            self.model = model;
        }

        if let Some(base_url) = lookup("PERSONACHAT_BASE_URL") {
            self.base_url = base_url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".personachat")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.context.word_budget == 0 {
            return Err(ConfigError::ValidationError(
                "context.word_budget must be > 0".into(),
            ));
        }

        let share = self.context.document_share;
        if !(share > 0.0 && share <= 1.0) {
            return Err(ConfigError::ValidationError(
                "context.document_share must be in (0.0, 1.0]".into(),
            ));
        }

        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("base_url must not be empty".into()));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            provider: default_provider(),
            model: default_model(),
            temperature: None,
            max_tokens: None,
            request_timeout_secs: default_request_timeout_secs(),
            context: ContextConfig::default(),
            persona: PersonaConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for personachat_core::Error {
    fn from(e: ConfigError) -> Self {
        Self::Config {
            message: e.to_string(),
        }
    }
}
