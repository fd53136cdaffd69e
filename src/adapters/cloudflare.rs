//! Cloudflare Workers AI chat adapter.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::pricing::ChatRequest;
use crate::ports::{ChatCompletion, ChatProvider, InferenceError};

/// Configuration for the Workers AI adapter.
#[derive(Clone)]
pub struct CloudflareConfig {
    account_id: String,
    api_token: SecretString,
    /// Base URL for the Cloudflare API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl CloudflareConfig {
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: SecretString::new(api_token.into()),
            base_url: "https://api.cloudflare.com/client/v4".to_string(),
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
}

/// Workers AI client.
pub struct CloudflareProvider {
    config: CloudflareConfig,
    client: reqwest::Client,
}

impl CloudflareProvider {
    pub fn new(config: CloudflareConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    fn run_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_id,
            model
        )
    }
}

#[async_trait]
impl ChatProvider for CloudflareProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, InferenceError> {
        let wire = RunRequest {
            messages: request
                .messages
                .iter()
                .map(|m| RunMessage { role: &m.role, content: &m.content })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.run_url(&request.model))
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_token.expose_secret()),
            )
            .json(&wire)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout { timeout_secs: self.config.timeout.as_secs() }
                } else {
                    InferenceError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(InferenceError::AuthenticationFailed);
        }
        if status.as_u16() == 429 {
            return Err(InferenceError::RateLimited { retry_after_secs: 30 });
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::unavailable(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::InvalidRequest(body));
        }

        let body: RunResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::parse(format!("bad run body: {e}")))?;

        if !body.success {
            let reason = body
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(InferenceError::unavailable(reason));
        }

        let result = body
            .result
            .ok_or_else(|| InferenceError::parse("missing result"))?;

        Ok(ChatCompletion {
            id: format!("cf-{}", uuid::Uuid::new_v4()),
            model: request.model.clone(),
            content: result.response,
            finish_reason: Some("stop".to_string()),
            usage: None,
        })
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

// ----- Workers AI types -----

#[derive(Serialize)]
struct RunRequest<'a> {
    messages: Vec<RunMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct RunMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct RunResponse {
    success: bool,
    #[serde(default)]
    result: Option<RunResult>,
    #[serde(default)]
    errors: Vec<RunError>,
}

#[derive(Deserialize)]
struct RunResult {
    response: String,
}

#[derive(Deserialize)]
struct RunError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_url_includes_account_and_model() {
        let provider = CloudflareProvider::new(CloudflareConfig::new("acct-1", "token"));
        assert_eq!(
            provider.run_url("@cf/meta/llama-3.1-8b-instruct"),
            "https://api.cloudflare.com/client/v4/accounts/acct-1/ai/run/@cf/meta/llama-3.1-8b-instruct"
        );
    }

    #[test]
    fn run_response_parses() {
        let raw = r#"{"success":true,"result":{"response":"hi there"},"errors":[]}"#;
        let body: RunResponse = serde_json::from_str(raw).unwrap();
        assert!(body.success);
        assert_eq!(body.result.unwrap().response, "hi there");
    }

    #[test]
    fn run_error_parses() {
        let raw = r#"{"success":false,"errors":[{"message":"model not found"}]}"#;
        let body: RunResponse = serde_json::from_str(raw).unwrap();
        assert!(!body.success);
        assert_eq!(body.errors[0].message, "model not found");
    }
}
