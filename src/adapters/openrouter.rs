//! OpenRouter adapter: chat completions and the model catalog source.
//!
//! Speaks the OpenAI-compatible API. One adapter serves two ports:
//! `ChatProvider` for the paid chat endpoint and `ModelSource` for the
//! model catalog cache.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::catalog::{CatalogEntry, ModelSource, ModelSourceError};
use crate::domain::pricing::ChatRequest;
use crate::ports::{ChatCompletion, ChatProvider, InferenceError, TokenUsage};

/// Configuration for the OpenRouter adapter.
#[derive(Clone)]
pub struct OpenRouterConfig {
    api_key: SecretString,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenRouter API client.
pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url.trim_end_matches('/'))
    }

    fn map_send_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout { timeout_secs: self.config.timeout.as_secs() }
        } else if e.is_connect() {
            InferenceError::network(format!("connection failed: {e}"))
        } else {
            InferenceError::network(e.to_string())
        }
    }

    async fn handle_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, InferenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 => Err(InferenceError::AuthenticationFailed),
            429 => Err(InferenceError::RateLimited {
                retry_after_secs: parse_retry_after(&error_body),
            }),
            400 => Err(InferenceError::InvalidRequest(error_body)),
            500..=599 => Err(InferenceError::unavailable(format!(
                "server error {status}: {error_body}"
            ))),
            _ => Err(InferenceError::network(format!(
                "unexpected status {status}: {error_body}"
            ))),
        }
    }
}

/// Parses retry-after seconds from an error body; defaults to 30.
fn parse_retry_after(error_body: &str) -> u32 {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(error_body) {
        if let Some(s) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            if let Some(idx) = s.find("try again in ") {
                let rest = &s[idx + 13..];
                if let Some(num_end) = rest.find(|c: char| !c.is_ascii_digit()) {
                    if let Ok(secs) = rest[..num_end].parse::<u32>() {
                        return secs;
                    }
                }
            }
        }
    }
    30
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, InferenceError> {
        let wire = WireRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage { role: &m.role, content: &m.content })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .json(&wire)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = self.handle_status(response).await?;

        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::parse(format!("bad completion body: {e}")))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::parse("no choices in response"))?;

        Ok(ChatCompletion {
            id: body.id,
            model: body.model,
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            usage: body.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}

#[async_trait]
impl ModelSource for OpenRouterProvider {
    async fn fetch_models(&self) -> Result<Vec<CatalogEntry>, ModelSourceError> {
        let response = self
            .client
            .get(self.models_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .send()
            .await
            .map_err(|e| ModelSourceError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModelSourceError(format!(
                "model list returned {}",
                response.status()
            )));
        }

        let body: ModelListResponse = response
            .json()
            .await
            .map_err(|e| ModelSourceError(format!("bad model list body: {e}")))?;

        // Upstream prices are USD per token as decimal strings; the
        // catalog wants USD per 1k. Unparseable rows are skipped here,
        // out-of-range rows at cache load.
        Ok(body
            .data
            .into_iter()
            .filter_map(|m| {
                let prompt: f64 = m.pricing.prompt.parse().ok()?;
                let completion: f64 = m.pricing.completion.parse().ok()?;
                Some(CatalogEntry {
                    id: m.id,
                    prompt_per_k: prompt * 1000.0,
                    completion_per_k: completion * 1000.0,
                })
            })
            .collect())
    }
}

// ----- OpenRouter API types -----

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    id: String,
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ModelListResponse {
    data: Vec<ModelRow>,
}

#[derive(Deserialize)]
struct ModelRow {
    id: String,
    pricing: ModelRowPricing,
}

#[derive(Deserialize)]
struct ModelRowPricing {
    prompt: String,
    completion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = OpenRouterConfig::new("test-key")
            .with_base_url("https://custom.example")
            .with_timeout(Duration::from_secs(10));
        assert_eq!(config.base_url, "https://custom.example");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn urls_strip_trailing_slash() {
        let provider =
            OpenRouterProvider::new(OpenRouterConfig::new("k").with_base_url("https://or/"));
        assert_eq!(provider.completions_url(), "https://or/chat/completions");
        assert_eq!(provider.models_url(), "https://or/models");
    }

    #[test]
    fn parse_retry_after_from_message() {
        let error = r#"{"error":{"message":"Rate limit exceeded. Please try again in 12 seconds."}}"#;
        assert_eq!(parse_retry_after(error), 12);
    }

    #[test]
    fn parse_retry_after_default() {
        assert_eq!(parse_retry_after(r#"{"error":{"message":"nope"}}"#), 30);
        assert_eq!(parse_retry_after("not json"), 30);
    }

    #[test]
    fn model_list_parses_per_token_prices() {
        let raw = r#"{"data":[
            {"id":"a/one","pricing":{"prompt":"0.000001","completion":"0.000002"}},
            {"id":"b/bad","pricing":{"prompt":"oops","completion":"0.1"}}
        ]}"#;
        let body: ModelListResponse = serde_json::from_str(raw).unwrap();
        let entries: Vec<CatalogEntry> = body
            .data
            .into_iter()
            .filter_map(|m| {
                let prompt: f64 = m.pricing.prompt.parse().ok()?;
                let completion: f64 = m.pricing.completion.parse().ok()?;
                Some(CatalogEntry { id: m.id, prompt_per_k: prompt * 1000.0, completion_per_k: completion * 1000.0 })
            })
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "a/one");
        assert!((entries[0].prompt_per_k - 0.001).abs() < 1e-12);
    }
}
