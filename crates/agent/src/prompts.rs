use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use productmaster_core::config::PromptConfig;
use productmaster_core::domain::product::ProductType;
use productmaster_core::domain::query::SearchLimits;
use productmaster_db::PromptRepository;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::warn;

pub fn pre_prompt_key(operation: &str) -> String {
    format!("{operation}_pre")
}

pub fn post_prompt_key(operation: &str) -> String {
    format!("{operation}_post")
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt `{0}` is not registered")]
    NotFound(String),
    #[error("prompt store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PromptStore: Send + Sync {
    async fn get_prompt(&self, key: &str) -> Result<String, PromptError>;
}

/// Prompt store backed by a [`PromptRepository`] (SQLite or in-memory).
pub struct RepositoryPromptStore {
    repository: Arc<dyn PromptRepository>,
}

impl RepositoryPromptStore {
    pub fn new(repository: Arc<dyn PromptRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl PromptStore for RepositoryPromptStore {
    async fn get_prompt(&self, key: &str) -> Result<String, PromptError> {
        match self.repository.find_prompt(key).await {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Err(PromptError::NotFound(key.to_string())),
            Err(error) => Err(PromptError::Unavailable(error.to_string())),
        }
    }
}

/// Prompt store served by the prompt-management HTTP service.
pub struct HttpPromptStore {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct PromptPayload {
    prompt_text: String,
}

impl HttpPromptStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PromptError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| PromptError::Unavailable(error.to_string()))?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    pub fn from_config(config: &PromptConfig) -> Result<Option<Self>, PromptError> {
        config
            .management_url
            .as_ref()
            .map(|url| Self::new(url.clone(), Duration::from_secs(config.timeout_secs)))
            .transpose()
    }

    pub fn prompt_url(&self, key: &str) -> String {
        format!("{}/api/system-prompts/{key}", self.base_url)
    }
}

#[async_trait]
impl PromptStore for HttpPromptStore {
    async fn get_prompt(&self, key: &str) -> Result<String, PromptError> {
        let response = self
            .client
            .get(self.prompt_url(key))
            .send()
            .await
            .map_err(|error| PromptError::Unavailable(error.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<PromptPayload>()
                .await
                .map(|payload| payload.prompt_text)
                .map_err(|error| PromptError::Unavailable(error.to_string())),
            StatusCode::NOT_FOUND => Err(PromptError::NotFound(key.to_string())),
            status => Err(PromptError::Unavailable(format!(
                "prompt service returned {status} for `{key}`"
            ))),
        }
    }
}

/// Values available to `{{ ... }}` expressions inside stored prompt templates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptContext {
    pub product_types: Vec<&'static str>,
    pub max_limit: u32,
    pub default_limit: u32,
}

impl PromptContext {
    pub fn new(limits: SearchLimits) -> Self {
        Self {
            product_types: ProductType::ALL.iter().map(|kind| kind.as_str()).collect(),
            max_limit: limits.max_limit,
            default_limit: limits.default_limit,
        }
    }

    fn tera_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("product_types", &self.product_types);
        context.insert("max_limit", &self.max_limit);
        context.insert("default_limit", &self.default_limit);
        context
    }

    /// Renders a stored template. Templates that fail to render are used as-is.
    pub fn render(&self, key: &str, template: &str) -> String {
        if !template.contains("{{") && !template.contains("{%") {
            return template.to_string();
        }

        match Tera::one_off(template, &self.tera_context(), false) {
            Ok(rendered) => rendered,
            Err(error) => {
                warn!(
                    event_name = "prompt.render.fallback",
                    prompt_key = key,
                    error = %error,
                    "prompt template did not render, using it verbatim"
                );
                template.to_string()
            }
        }
    }
}
