//! Structured-log sink transport port.

use async_trait::async_trait;
use serde_json::Value;

/// Port for the append-only remote log sink. The submission queue and
/// drop policy live in the adapter; this is only the wire.
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Ships a batch of structured events. Best effort; the caller
    /// never retries.
    async fn ship(&self, events: &[Value]) -> Result<(), LogTransportError>;
}

/// Log shipping failures.
#[derive(Debug, thiserror::Error)]
#[error("log sink error: {0}")]
pub struct LogTransportError(pub String);
