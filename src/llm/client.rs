use super::{BackendSettings, ConfigError, GenerateFuture, Provider, ResponseGenerator};
use crate::util::sanitize_api_response;
use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_tokens: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// HTTP backend for one provider
#[derive(Debug, Clone)]
pub struct LlmBackend {
    provider: Provider,
    settings: BackendSettings,
    url: Url,
    client: reqwest::Client,
}

impl LlmBackend {
    pub fn new(provider: Provider, settings: BackendSettings) -> Result<Self, ConfigError> {
        let url = request_url(provider, &settings)?;
        Ok(Self {
            provider,
            settings,
            url,
            client: reqwest::Client::new(),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Final request URL, including the Gemini model rewrite and key
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// JSON body for `prompt` in the provider's wire shape
    pub fn request_body(&self, prompt: &str) -> anyhow::Result<serde_json::Value> {
        let settings = &self.settings;
        let model = settings.model_for(self.provider).unwrap_or_default();
        let body = match self.provider {
            Provider::OpenAi | Provider::Local => serde_json::to_value(ChatRequest {
                model,
                temperature: settings.temperature,
                max_tokens: settings.max_output_tokens,
                seed: settings.seed,
                messages: vec![Message::user(prompt)],
            }),
            Provider::Anthropic => serde_json::to_value(AnthropicRequest {
                model,
                max_tokens: settings
                    .max_output_tokens
                    .unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
                temperature: settings.temperature,
                messages: vec![Message::user(prompt)],
            }),
            Provider::Gemini => serde_json::to_value(GeminiRequest {
                contents: vec![GeminiContent {
                    role: "user".to_string(),
                    parts: vec![GeminiPart {
                        text: Some(prompt.to_string()),
                    }],
                }],
                generation_config: GenerationConfig {
                    temperature: settings.temperature,
                    seed: settings.seed,
                    max_output_tokens: settings.max_output_tokens,
                    thinking_tokens: settings.thinking_tokens,
                },
            }),
        };
        body.context("Failed to encode request body")
    }

    async fn send(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        let body = self.request_body(prompt)?;
        let mut request = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .json(&body);

        let api_key = self.settings.api_key.as_deref().filter(|k| !k.is_empty());
        match (self.provider, api_key) {
            (Provider::OpenAi, Some(key)) => {
                request = request.header("Authorization", format!("Bearer {}", key));
            }
            (Provider::Anthropic, key) => {
                request = request.header("anthropic-version", ANTHROPIC_VERSION);
                if let Some(key) = key {
                    request = request.header("x-api-key", key);
                }
            }
            _ => {}
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} backend failed", self.provider.label()))?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            log::warn!(
                "{} backend returned {}: {}",
                self.provider.label(),
                status,
                sanitize_api_response(&text)
            );
            return Ok(None);
        }

        parse_reply(self.provider, &text)
    }
}

impl ResponseGenerator for LlmBackend {
    fn generate_response<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.send(prompt))
    }
}

/// Build the request URL. Gemini gets its model spliced into the path when
/// one is configured, and the API key as the `key` query parameter.
fn request_url(provider: Provider, settings: &BackendSettings) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        endpoint: settings.endpoint.clone(),
        reason,
    };

    let mut endpoint = settings.endpoint.trim().to_string();
    if provider == Provider::Gemini {
        if let Some(model) = settings.model.as_deref().filter(|m| !m.trim().is_empty()) {
            if !endpoint.contains(model) {
                let re = Regex::new(r"models/[^:]+").map_err(|e| invalid(e.to_string()))?;
                endpoint = re
                    .replace(&endpoint, format!("models/{}", model).as_str())
                    .into_owned();
            }
        }
    }

    let mut url = Url::parse(&endpoint).map_err(|e| invalid(e.to_string()))?;
    if provider == Provider::Gemini {
        if let Some(key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) {
            url.query_pairs_mut().append_pair("key", key);
        }
    }
    Ok(url)
}

/// Extract the reply text from a successful response body
fn parse_reply(provider: Provider, text: &str) -> anyhow::Result<Option<String>> {
    let reply = match provider {
        Provider::OpenAi | Provider::Local => {
            let parsed: ChatResponse = serde_json::from_str(text)
                .with_context(|| format!("Failed to parse {} response", provider.label()))?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
        }
        Provider::Anthropic => {
            let parsed: AnthropicResponse = serde_json::from_str(text)
                .context("Failed to parse anthropic response")?;
            parsed.content.into_iter().next().and_then(|b| b.text)
        }
        Provider::Gemini => {
            let parsed: GeminiResponse =
                serde_json::from_str(text).context("Failed to parse gemini response")?;
            parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .and_then(|c| c.parts.into_iter().next())
                .and_then(|p| p.text)
        }
    };
    Ok(reply.map(|r| r.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str) -> BackendSettings {
        BackendSettings {
            endpoint: endpoint.to_string(),
            ..BackendSettings::default()
        }
    }

    fn backend(settings: BackendSettings) -> LlmBackend {
        let provider = settings.provider().unwrap();
        LlmBackend::new(provider, settings).unwrap()
    }

    #[test]
    fn test_openai_body_shape() {
        let b = backend(BackendSettings {
            seed: Some(7),
            ..settings("https://api.openai.com/v1/chat/completions")
        });
        let body = b.request_body("check this").unwrap();
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["temperature"], 1.0);
        assert_eq!(body["seed"], 7);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "check this");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_local_uses_llama3_default() {
        let b = backend(settings("http://localhost:11434/v1/chat/completions"));
        assert_eq!(b.provider(), Provider::Local);
        assert_eq!(b.request_body("p").unwrap()["model"], "llama3");
    }

    #[test]
    fn test_anthropic_body_shape() {
        let b = backend(settings("https://api.anthropic.com/v1/messages"));
        let body = b.request_body("p").unwrap();
        assert_eq!(body["model"], "claude-3");
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["messages"][0]["content"], "p");
    }

    #[test]
    fn test_gemini_body_and_url() {
        let b = backend(BackendSettings {
            api_key: Some("g-key".into()),
            model: Some("gemini-1.5-flash".into()),
            max_output_tokens: Some(512),
            ..settings(
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
            )
        });
        assert_eq!(
            b.url().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=g-key"
        );
        let body = b.request_body("p").unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "p");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
        assert_eq!(body["generationConfig"]["temperature"], 1.0);
        assert!(body["generationConfig"].get("seed").is_none());
    }

    #[test]
    fn test_gemini_url_kept_when_model_already_present() {
        let b = backend(BackendSettings {
            model: Some("gemini-pro".into()),
            ..settings(
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
            )
        });
        assert!(b.url().as_str().ends_with("models/gemini-pro:generateContent"));
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let s = settings("api.openai.com/v1/chat");
        assert!(matches!(
            LlmBackend::new(Provider::OpenAi, s),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_parse_replies() {
        let openai = r#"{"choices":[{"message":{"role":"assistant","content":"  [ERROR] x (2.1.1) (1)\n"}}]}"#;
        assert_eq!(
            parse_reply(Provider::OpenAi, openai).unwrap().as_deref(),
            Some("[ERROR] x (2.1.1) (1)")
        );

        let anthropic = r#"{"content":[{"type":"text","text":"ok"}]}"#;
        assert_eq!(
            parse_reply(Provider::Anthropic, anthropic).unwrap().as_deref(),
            Some("ok")
        );

        let gemini = r#"{"candidates":[{"content":{"parts":[{"text":"fine\n"}]}}]}"#;
        assert_eq!(
            parse_reply(Provider::Gemini, gemini).unwrap().as_deref(),
            Some("fine")
        );

        assert_eq!(parse_reply(Provider::OpenAi, r#"{"choices":[]}"#).unwrap(), None);
        assert!(parse_reply(Provider::Anthropic, "not json").is_err());
    }
}
