//! Hiro API adapter for blockchain lookups.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::ports::{ChainLookup, ChainLookupError};

/// Configuration for the Hiro API client.
#[derive(Debug, Clone)]
pub struct HiroConfig {
    /// Base URL for the Hiro API.
    pub base_url: String,
    /// Optional API key; anonymous access is rate limited.
    pub api_key: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl HiroConfig {
    pub fn new() -> Self {
        Self {
            base_url: "https://api.hiro.so".to_string(),
            api_key: None,
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

impl Default for HiroConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Hiro API client.
pub struct HiroClient {
    config: HiroConfig,
    client: reqwest::Client,
}

impl HiroClient {
    pub fn new(config: HiroConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    async fn get_json(&self, path: &str) -> Result<Value, ChainLookupError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChainLookupError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ChainLookupError::NotFound);
        }
        if status.is_server_error() {
            return Err(ChainLookupError::Unavailable(format!("{status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainLookupError::Network(format!("{status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ChainLookupError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ChainLookup for HiroClient {
    async fn profile(&self, address: &str) -> Result<Value, ChainLookupError> {
        let balances = self
            .get_json(&format!("/extended/v1/address/{address}/balances"))
            .await?;
        // BNS lookups are optional enrichment; their absence is not an
        // error for the profile as a whole.
        let names = self
            .get_json(&format!("/v1/addresses/stacks/{address}"))
            .await
            .ok();

        Ok(json!({
            "address": address,
            "balances": balances,
            "names": names.and_then(|n| n.get("names").cloned()).unwrap_or(Value::Null),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = HiroConfig::new()
            .with_base_url("https://custom.hiro")
            .with_api_key("key-1");
        assert_eq!(config.base_url, "https://custom.hiro");
        assert_eq!(config.api_key.as_deref(), Some("key-1"));
    }
}
