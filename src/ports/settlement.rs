//! Settlement relay port.
//!
//! The relay (facilitator) is authoritative for payment validity, chain
//! submission, and payer extraction. The gateway never signs or
//! broadcasts anything itself; it hands over the client's payload and
//! the requirement it advertised, and trusts the result.

use async_trait::async_trait;

use crate::domain::payment::{PaymentPayload, PaymentRequirements, SettlementResult};

/// Port for the external settlement relay.
#[async_trait]
pub trait SettlementClient: Send + Sync {
    /// Verifies and settles a signed transfer against one advertised
    /// requirement.
    ///
    /// Relay-side rejections come back as `Ok` with `success == false`
    /// and an `error_reason`; transport trouble reaching the relay is a
    /// [`SettlementError`].
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettlementResult, SettlementError>;
}

/// Transport failures talking to the relay.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettlementError {
    #[error("network error: {0}")]
    Network(String),

    #[error("settlement timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("relay unavailable: {0}")]
    Unavailable(String),

    #[error("relay response unparseable: {0}")]
    Parse(String),
}

impl SettlementError {
    /// Free-form reason string fed into the failure taxonomy. Worded so
    /// the classifier lands each variant in the right class.
    pub fn relay_reason(&self) -> String {
        match self {
            SettlementError::Network(msg) => format!("network error: {msg}"),
            SettlementError::Timeout { timeout_secs } => {
                format!("timeout after {timeout_secs}s")
            }
            SettlementError::Unavailable(msg) => format!("relay unavailable: {msg}"),
            SettlementError::Parse(msg) => format!("network response unparseable: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::classify_relay_error;

    #[test]
    fn transport_errors_classify_as_retryable() {
        let reason = SettlementError::Network("connection refused".into()).relay_reason();
        assert_eq!(classify_relay_error(&reason).status, 502);

        let reason = SettlementError::Timeout { timeout_secs: 120 }.relay_reason();
        assert_eq!(classify_relay_error(&reason).status, 502);

        let reason = SettlementError::Unavailable("maintenance".into()).relay_reason();
        assert_eq!(classify_relay_error(&reason).status, 503);
    }
}
