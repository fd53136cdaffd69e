//! Blockchain lookup port.

use async_trait::async_trait;
use serde_json::Value;

/// Port for remote chain-state lookups (account profiles, balances).
#[async_trait]
pub trait ChainLookup: Send + Sync {
    /// Fetches the on-chain profile for an address: balances, nonce,
    /// and BNS names where available.
    async fn profile(&self, address: &str) -> Result<Value, ChainLookupError>;
}

/// Chain lookup failures. Surfaced to the caller as the handler's own
/// error, never consumed silently.
#[derive(Debug, thiserror::Error)]
pub enum ChainLookupError {
    #[error("address not found")]
    NotFound,

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("response unparseable: {0}")]
    Parse(String),
}

impl ChainLookupError {
    /// HTTP status the gateway surfaces this failure as.
    pub fn status_code(&self) -> u16 {
        match self {
            ChainLookupError::NotFound => 404,
            ChainLookupError::Network(_) => 502,
            ChainLookupError::Unavailable(_) => 502,
            ChainLookupError::Parse(_) => 502,
        }
    }
}
