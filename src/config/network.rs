//! Network identity: chain, recipient address, public base URL.

use serde::Deserialize;

use crate::domain::payment::StacksNetwork;
use crate::domain::stacks::c32::c32_address_decode;

use super::error::ValidationError;

/// Chain identity the gateway settles on.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Which Stacks network payments settle on.
    #[serde(default)]
    pub network: StacksNetwork,

    /// Address all payments are made out to.
    pub recipient: String,

    /// Public base URL used in challenges and discovery documents.
    #[serde(default = "default_base_url")]
    pub public_base_url: String,
}

impl NetworkConfig {
    /// Validate recipient address and base URL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.recipient.is_empty() {
            return Err(ValidationError::MissingRequired("network.recipient"));
        }
        let decoded = c32_address_decode(&self.recipient)
            .map_err(|e| ValidationError::InvalidRecipient(e.to_string()))?;
        let matches_network = match self.network {
            StacksNetwork::Mainnet => decoded.is_mainnet(),
            StacksNetwork::Testnet => !decoded.is_mainnet(),
        };
        if !matches_network {
            return Err(ValidationError::RecipientNetworkMismatch);
        }
        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidBaseUrl);
        }
        Ok(())
    }

    /// Absolute URL for a path under the public base.
    pub fn resource_url(&self, path: &str) -> String {
        format!("{}{}", self.public_base_url.trim_end_matches('/'), path)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
