//! Language-model backends
//!
//! The check depends on one capability, [`ResponseGenerator`]: turn a prompt
//! into reply text, or nothing. [`LlmBackend`] implements it for the four
//! supported provider shapes; which one is used is decided from the endpoint
//! string alone by [`Provider::from_endpoint`].

mod client;

pub use client::LlmBackend;

use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`ResponseGenerator::generate_response`]
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>>;

/// Produces a reply for a prompt.
///
/// `Ok(None)` means the backend answered without a usable reply (HTTP error
/// status, empty body). `Err` is reserved for transport and decoding
/// failures; callers treat both as "no findings".
pub trait ResponseGenerator: Send + Sync {
    fn generate_response<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
}

/// Configuration errors raised before any network call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported LLM endpoint: '{0}'")]
    UnsupportedEndpoint(String),
    #[error("Invalid LLM endpoint URL '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("Failed to read config file {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("Invalid config file {path}: {reason}")]
    Invalid { path: String, reason: String },
}

/// Wire protocol family of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
    Local,
}

const GEMINI_HOSTS: &[&str] = &["generativelanguage.googleapis.com"];
const OPENAI_HOSTS: &[&str] = &["api.openai.com", "mistral.ai", "openrouter.ai", "groq.com"];
const ANTHROPIC_HOSTS: &[&str] = &["anthropic.com"];
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "[::1]"];

impl Provider {
    /// Pick the provider for an endpoint. Pure; no I/O.
    pub fn from_endpoint(endpoint: &str) -> Result<Self, ConfigError> {
        let table: [(&[&str], Provider); 4] = [
            (GEMINI_HOSTS, Provider::Gemini),
            (OPENAI_HOSTS, Provider::OpenAi),
            (ANTHROPIC_HOSTS, Provider::Anthropic),
            (LOCAL_HOSTS, Provider::Local),
        ];
        // Hosts are case-insensitive
        let normalized = endpoint.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ConfigError::UnsupportedEndpoint(endpoint.to_string()));
        }
        table
            .iter()
            .find(|(hosts, _)| hosts.iter().any(|h| normalized.contains(h)))
            .map(|(_, provider)| *provider)
            .ok_or_else(|| ConfigError::UnsupportedEndpoint(endpoint.to_string()))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
            Provider::Local => "local",
        }
    }

    /// Model used when none is configured. Gemini takes its model from the URL.
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("gpt-4"),
            Provider::Anthropic => Some("claude-3"),
            Provider::Local => Some("llama3"),
            Provider::Gemini => None,
        }
    }

    /// Provider-specific environment variable holding the API key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::Local => None,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Local)
    }
}

/// Endpoint, credentials and sampling settings for the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: f64,
    pub seed: Option<i64>,
    pub max_output_tokens: Option<u32>,
    pub thinking_tokens: Option<u32>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            model: None,
            temperature: 1.0,
            seed: None,
            max_output_tokens: None,
            thinking_tokens: None,
        }
    }
}

impl BackendSettings {
    pub fn provider(&self) -> Result<Provider, ConfigError> {
        Provider::from_endpoint(&self.endpoint)
    }

    /// Configured model, else the provider default
    pub fn model_for(&self, provider: Provider) -> Option<String> {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| provider.default_model().map(str::to_string))
    }
}

/// Build the backend for the configured endpoint
pub fn create_backend(settings: &BackendSettings) -> Result<LlmBackend, ConfigError> {
    let provider = settings.provider()?;
    log::debug!(
        "selected {} backend for {}",
        provider.label(),
        settings.endpoint
    );
    if provider.requires_api_key() && settings.api_key.is_none() {
        log::warn!(
            "No API key configured for the {} endpoint; requests are sent without credentials",
            provider.label()
        );
    }
    LlmBackend::new(provider, settings.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_selection_table() {
        let cases = [
            (
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
                Provider::Gemini,
            ),
            ("https://api.openai.com/v1/chat/completions", Provider::OpenAi),
            ("https://api.mistral.ai/v1/chat/completions", Provider::OpenAi),
            ("https://openrouter.ai/api/v1/chat/completions", Provider::OpenAi),
            ("https://api.groq.com/openai/v1/chat/completions", Provider::OpenAi),
            ("https://api.anthropic.com/v1/messages", Provider::Anthropic),
            ("http://localhost:11434/v1/chat/completions", Provider::Local),
            ("http://127.0.0.1:8080/v1/chat/completions", Provider::Local),
            ("http://[::1]:8080/v1/chat/completions", Provider::Local),
            ("https://API.OpenAI.com/v1/chat/completions", Provider::OpenAi),
            ("http://LOCALHOST:11434/v1/chat/completions", Provider::Local),
            ("https://Api.Anthropic.COM/v1/messages", Provider::Anthropic),
        ];
        for (endpoint, expected) in cases {
            assert_eq!(Provider::from_endpoint(endpoint), Ok(expected), "{endpoint}");
        }
    }

    #[test]
    fn test_unknown_and_empty_endpoints_are_rejected() {
        assert_eq!(
            Provider::from_endpoint("https://example.com/llm"),
            Err(ConfigError::UnsupportedEndpoint(
                "https://example.com/llm".to_string()
            ))
        );
        assert!(matches!(
            Provider::from_endpoint("   "),
            Err(ConfigError::UnsupportedEndpoint(_))
        ));
        assert!(create_backend(&BackendSettings::default()).is_err());
    }

    #[test]
    fn test_model_defaults() {
        let settings = BackendSettings::default();
        assert_eq!(settings.model_for(Provider::OpenAi).as_deref(), Some("gpt-4"));
        assert_eq!(settings.model_for(Provider::Local).as_deref(), Some("llama3"));
        assert_eq!(settings.model_for(Provider::Gemini), None);

        let settings = BackendSettings {
            model: Some("gpt-4o-mini".into()),
            ..BackendSettings::default()
        };
        assert_eq!(
            settings.model_for(Provider::OpenAi).as_deref(),
            Some("gpt-4o-mini")
        );
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: BackendSettings =
            toml::from_str("endpoint = \"https://api.openai.com/v1/chat/completions\"").unwrap();
        assert_eq!(settings.temperature, 1.0);
        assert_eq!(settings.provider(), Ok(Provider::OpenAi));
    }
}
