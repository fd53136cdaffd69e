//! Inference provider and model-catalog configuration.

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;

/// Inference provider configuration.
///
/// The OpenRouter key gates the dynamic chat endpoint and the model
/// catalog; Cloudflare and Hiro credentials are optional and disable
/// their endpoints when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// OpenRouter API key.
    #[serde(default)]
    pub openrouter_api_key: Option<String>,

    /// Cloudflare account id for Workers AI.
    #[serde(default)]
    pub cloudflare_account_id: Option<String>,

    /// Cloudflare API token.
    #[serde(default)]
    pub cloudflare_api_token: Option<String>,

    /// Hiro API key for blockchain lookups.
    #[serde(default)]
    pub hiro_api_key: Option<String>,

    /// Model catalog snapshot TTL, seconds.
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_secs: u64,

    /// Backoff after a failed catalog refresh, seconds.
    #[serde(default = "default_catalog_backoff")]
    pub catalog_backoff_secs: u64,

    /// Hard timeout for one catalog refresh, seconds.
    #[serde(default = "default_catalog_refresh_timeout")]
    pub catalog_refresh_timeout_secs: u64,
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.catalog_ttl_secs == 0 {
            return Err(ValidationError::InvalidCatalogTtl);
        }
        Ok(())
    }

    /// OpenRouter key as a secret, when configured.
    pub fn openrouter_key(&self) -> Option<SecretString> {
        self.openrouter_api_key
            .as_ref()
            .map(|k| SecretString::new(k.clone()))
    }

    /// Cloudflare credentials, when fully configured.
    pub fn cloudflare_credentials(&self) -> Option<(String, SecretString)> {
        match (&self.cloudflare_account_id, &self.cloudflare_api_token) {
            (Some(account), Some(token)) => {
                Some((account.clone(), SecretString::new(token.clone())))
            }
            _ => None,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            openrouter_api_key: None,
            cloudflare_account_id: None,
            cloudflare_api_token: None,
            hiro_api_key: None,
            catalog_ttl_secs: default_catalog_ttl(),
            catalog_backoff_secs: default_catalog_backoff(),
            catalog_refresh_timeout_secs: default_catalog_refresh_timeout(),
        }
    }
}

fn default_catalog_ttl() -> u64 {
    3600
}

fn default_catalog_backoff() -> u64 {
    30
}

fn default_catalog_refresh_timeout() -> u64 {
    3
}
