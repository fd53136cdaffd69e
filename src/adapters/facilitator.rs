//! Settlement relay (facilitator) adapter.
//!
//! Implements the `SettlementClient` port over the facilitator's HTTP
//! API. The relay verifies the signed transfer, submits it on chain, and
//! reports the payer address; the gateway forwards the payload verbatim
//! and never inspects the transfer blob.
//!
//! # Configuration
//!
//! ```ignore
//! let config = FacilitatorConfig::new("https://facilitator.stackspay.org")
//!     .with_timeout(Duration::from_secs(120));
//! let client = FacilitatorClient::new(config);
//! ```

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::domain::payment::{
    PaymentPayload, PaymentRequirements, SettlementResult, X402_VERSION,
};
use crate::ports::{SettlementClient, SettlementError};

/// Facilitator binding.
#[derive(Debug, Clone)]
pub struct FacilitatorConfig {
    /// Relay base URL.
    pub base_url: String,
    /// Timeout for one settle call. Settlement waits for chain
    /// acceptance, so this is generous by default.
    pub timeout: Duration,
}

impl FacilitatorConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for the settlement relay.
pub struct FacilitatorClient {
    config: FacilitatorConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettleRequest<'a> {
    x402_version: u32,
    payment_payload: &'a PaymentPayload,
    payment_requirements: &'a PaymentRequirements,
}

impl FacilitatorClient {
    pub fn new(config: FacilitatorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    fn settle_url(&self) -> String {
        format!("{}/settle", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SettlementClient for FacilitatorClient {
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettlementResult, SettlementError> {
        let body = SettleRequest {
            x402_version: X402_VERSION,
            payment_payload: payload,
            payment_requirements: requirements,
        };

        let response = self
            .client
            .post(self.settle_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SettlementError::Timeout {
                        timeout_secs: self.config.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    SettlementError::Network(format!("connection failed: {e}"))
                } else {
                    SettlementError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 503 {
            let body = response.text().await.unwrap_or_default();
            return Err(SettlementError::Unavailable(body));
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(SettlementError::Network(format!(
                "relay returned {status}: {body}"
            )));
        }

        // 2xx and 4xx both carry a SettlementResult body; 4xx is the
        // relay rejecting the transfer, which the taxonomy handles.
        response
            .json::<SettlementResult>()
            .await
            .map_err(|e| SettlementError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = FacilitatorConfig::new("https://relay.example/")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(config.base_url, "https://relay.example/");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn settle_url_strips_trailing_slash() {
        let client = FacilitatorClient::new(FacilitatorConfig::new("https://relay.example/"));
        assert_eq!(client.settle_url(), "https://relay.example/settle");
    }

    #[test]
    fn settle_request_serializes_camel_case() {
        let payload = PaymentPayload {
            x402_version: X402_VERSION,
            scheme: "exact".into(),
            network: "stacks-mainnet".into(),
            payload: serde_json::json!({"transaction": "0x00"}),
        };
        let requirements = PaymentRequirements {
            scheme: "exact".into(),
            network: "stacks-mainnet".into(),
            max_amount_required: 1000,
            resource: "https://gw/hashing/sha256".into(),
            description: "d".into(),
            mime_type: "application/json".into(),
            pay_to: "SP000000000000000000002Q6VF78".into(),
            max_timeout_seconds: 60,
            asset: "STX".into(),
            extra: serde_json::Value::Null,
        };
        let body = SettleRequest {
            x402_version: X402_VERSION,
            payment_payload: &payload,
            payment_requirements: &requirements,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["x402Version"], 2);
        assert_eq!(v["paymentPayload"]["scheme"], "exact");
        assert_eq!(v["paymentRequirements"]["maxAmountRequired"], "1000");
    }
}
