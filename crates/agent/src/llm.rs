//! Language-model access.
//!
//! The pipeline only needs `generate(prompt) -> (text, latency)`. The HTTP
//! client speaks the Anthropic Messages, OpenAI Chat Completions and Ollama
//! generate APIs and is selected by configuration.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use productmaster_core::config::{LlmConfig, LlmProvider};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use thiserror::Error;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("llm authentication failed: {0}")]
    Auth(String),
    #[error("llm api error: HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("llm response had no text content")]
    EmptyResponse,
    #[error("llm client misconfigured: {0}")]
    Config(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation, LlmError>;
}

pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        let default_base = match config.provider {
            LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
            LlmProvider::OpenAi => OPENAI_BASE_URL,
            LlmProvider::Ollama => OLLAMA_BASE_URL,
        };
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_base.to_string());

        Ok(Self {
            client,
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn endpoint(&self) -> String {
        match self.provider {
            LlmProvider::Anthropic => format!("{}/messages", self.base_url),
            LlmProvider::OpenAi => format!("{}/chat/completions", self.base_url),
            LlmProvider::Ollama => format!("{}/api/generate", self.base_url),
        }
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match self.provider {
            LlmProvider::Anthropic => {
                let key = self.required_key()?;
                headers.insert(
                    "x-api-key",
                    HeaderValue::from_str(key)
                        .map_err(|error| LlmError::Auth(format!("invalid api key: {error}")))?,
                );
                headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
            }
            LlmProvider::OpenAi => {
                let key = self.required_key()?;
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}"))
                        .map_err(|error| LlmError::Auth(format!("invalid api key: {error}")))?,
                );
            }
            LlmProvider::Ollama => {}
        }

        Ok(headers)
    }

    fn required_key(&self) -> Result<&str, LlmError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::Config("api key is required for this provider".to_string()))
    }

    fn request_body(&self, prompt: &str) -> Value {
        build_request_body(self.provider, &self.model, self.max_tokens, self.temperature, prompt)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, prompt: &str) -> Result<Generation, LlmError> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .headers(self.headers()?)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LlmError::Auth(body));
            }
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let payload: Value = response.json().await?;
        let text = extract_text(self.provider, &payload).ok_or(LlmError::EmptyResponse)?;

        Ok(Generation { text, elapsed_ms: elapsed_ms(started) })
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Request body for one single-turn completion.
pub fn build_request_body(
    provider: LlmProvider,
    model: &str,
    max_tokens: u32,
    temperature: f32,
    prompt: &str,
) -> Value {
    match provider {
        LlmProvider::Anthropic => json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [{"role": "user", "content": prompt}],
        }),
        LlmProvider::OpenAi => json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [{"role": "user", "content": prompt}],
        }),
        LlmProvider::Ollama => json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {"temperature": temperature, "num_predict": max_tokens},
        }),
    }
}

pub fn extract_text(provider: LlmProvider, payload: &Value) -> Option<String> {
    let text = match provider {
        LlmProvider::Anthropic => payload
            .get("content")?
            .as_array()?
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        LlmProvider::OpenAi => payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)?
            .to_string(),
        LlmProvider::Ollama => payload.get("response").and_then(Value::as_str)?.to_string(),
    };

    (!text.is_empty()).then_some(text)
}
