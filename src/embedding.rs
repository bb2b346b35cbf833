//! HTTP embedding providers.
//!
//! Two providers are supported, selected by the project's provider name:
//!
//! | Provider | Endpoint | Auth | Default URL |
//! |----------|----------|------|-------------|
//! | `litellm` | `POST {url}/v1/embeddings` | Bearer key | `http://localhost:4000` |
//! | `ollama` | `POST {url}/api/embed` | none | `http://localhost:11434` |
//!
//! Both receive `{"model": ..., "input": ...}`. The response vector is taken
//! from `embeddings[0]` (ollama) or `data[0].embedding` (OpenAI shape, which
//! litellm proxies).
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use codesearch_core::embedding::Embedder;
use codesearch_core::CodesearchError;

use crate::config::Config;

/// Environment variable that overrides the litellm API key.
pub const LITELLM_API_KEY_ENV: &str = "LITELLM_API_KEY";

const DEFAULT_LITELLM_URL: &str = "http://localhost:4000";
const DEFAULT_LITELLM_KEY: &str = "sk-1234";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderKind {
    Litellm,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Litellm => "litellm",
            ProviderKind::Ollama => "ollama",
        }
    }

    fn default_url(&self) -> &'static str {
        match self {
            ProviderKind::Litellm => DEFAULT_LITELLM_URL,
            ProviderKind::Ollama => DEFAULT_OLLAMA_URL,
        }
    }

    fn endpoint_path(&self) -> &'static str {
        match self {
            ProviderKind::Litellm => "/v1/embeddings",
            ProviderKind::Ollama => "/api/embed",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = CodesearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "litellm" => Ok(ProviderKind::Litellm),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(CodesearchError::UnknownProvider(other.to_string())),
        }
    }
}

/// Either response shape; whichever is populated wins.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn parse_response(response: EmbedResponse) -> Result<Vec<f32>> {
    response
        .embeddings
        .into_iter()
        .next()
        .or_else(|| response.data.into_iter().next().map(|d| d.embedding))
        .ok_or_else(|| anyhow!("no embeddings in provider response"))
}

/// Embedder backed by a litellm or ollama HTTP endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    kind: ProviderKind,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
}

impl HttpEmbedder {
    /// Build an embedder for `kind` with URLs and keys from `config`.
    pub fn new(kind: ProviderKind, model: &str, config: &Config) -> Result<Self> {
        let overrides = match kind {
            ProviderKind::Litellm => &config.providers.litellm,
            ProviderKind::Ollama => &config.providers.ollama,
        };
        let base = overrides
            .url
            .clone()
            .unwrap_or_else(|| kind.default_url().to_string());
        let endpoint = format!("{}{}", base.trim_end_matches('/'), kind.endpoint_path());

        let api_key = match kind {
            ProviderKind::Litellm => Some(
                std::env::var(LITELLM_API_KEY_ENV)
                    .ok()
                    .filter(|k| !k.is_empty())
                    .or_else(|| overrides.api_key.clone())
                    .unwrap_or_else(|| DEFAULT_LITELLM_KEY.to_string()),
            ),
            ProviderKind::Ollama => overrides.api_key.clone(),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.embedding.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            kind,
            endpoint,
            api_key,
            model: model.to_string(),
            max_retries: config.embedding.max_retries,
        })
    }

    /// Parse the provider name and build its embedder.
    pub fn from_provider_name(provider: &str, model: &str, config: &Config) -> Result<Self> {
        let kind: ProviderKind = provider.parse()?;
        Self::new(kind, model, config)
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(CodesearchError::InvalidArgs("text to embed must not be empty".into()).into());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, provider = self.kind.as_str(), "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.endpoint).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: EmbedResponse = response.json().await?;
                        return parse_response(parsed);
                    }

                    // Rate limited or server error, retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!(
                            "{} API error {}: {}",
                            self.kind.as_str(),
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error other than 429, no retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("{} API error {}: {}", self.kind.as_str(), status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Embedding failed after retries")))
    }
}
