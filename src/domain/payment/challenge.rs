//! x402 protocol wire types.
//!
//! The challenge (`PaymentRequired`) travels both as the 402 JSON body and
//! base64-encoded in the `payment-required` header. The client's signed
//! payload arrives base64-encoded in `payment-signature` (legacy
//! `X-PAYMENT`), and the settlement receipt leaves base64-encoded in
//! `payment-response` (legacy `X-PAYMENT-RESPONSE`). The gateway never
//! inspects the signed transfer blob; it is forwarded verbatim to the
//! settlement relay.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::estimate::amount_string;

/// Protocol version the gateway speaks.
pub const X402_VERSION: u32 = 2;

/// Payment scheme for exact-amount transfers.
pub const SCHEME_EXACT: &str = "exact";

/// One acceptable way to pay for a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme; always `exact`.
    pub scheme: String,
    /// Chain identifier, e.g. `stacks-mainnet`.
    pub network: String,
    /// Atomic-unit amount the transfer must carry.
    #[serde(with = "amount_string")]
    pub max_amount_required: u128,
    /// Resource URL being purchased.
    pub resource: String,
    /// Human-readable description of the resource.
    pub description: String,
    /// MIME type of the resource response.
    pub mime_type: String,
    /// Recipient address.
    pub pay_to: String,
    /// Seconds the client has to broadcast the signed transfer.
    pub max_timeout_seconds: u64,
    /// Asset designation: SIP-010 contract id, or `STX` for native.
    pub asset: String,
    /// Tier and estimate metadata, plus optional discovery hints.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub extra: Value,
}

/// The 402 challenge advertising every acceptable payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    pub x402_version: u32,
    /// Why payment is required.
    pub error: String,
    pub accepts: Vec<PaymentRequirements>,
}

impl PaymentRequired {
    pub fn new(accepts: Vec<PaymentRequirements>) -> Self {
        Self {
            x402_version: X402_VERSION,
            error: "Payment required".to_string(),
            accepts,
        }
    }

    /// Encodes the challenge for the `payment-required` header.
    pub fn to_header_value(&self) -> String {
        encode_base64_json(self)
    }
}

/// The client's signed payment, decoded from `payment-signature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    /// Scheme the client chose; must match an advertised requirement.
    pub scheme: String,
    /// Network the client signed for.
    pub network: String,
    /// Opaque signed transfer blob, forwarded verbatim to the relay.
    pub payload: Value,
}

impl PaymentPayload {
    /// Decodes a base64-JSON header value.
    pub fn from_header_value(raw: &str) -> Result<Self, PayloadDecodeError> {
        let bytes = BASE64
            .decode(raw.trim())
            .map_err(|_| PayloadDecodeError::Base64)?;
        let payload: PaymentPayload =
            serde_json::from_slice(&bytes).map_err(|_| PayloadDecodeError::Json)?;
        if payload.x402_version != X402_VERSION {
            return Err(PayloadDecodeError::Version {
                got: payload.x402_version,
            });
        }
        Ok(payload)
    }
}

/// Why a `payment-signature` header failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PayloadDecodeError {
    #[error("payment header is not valid base64")]
    Base64,
    #[error("payment header is not valid JSON")]
    Json,
    #[error("unsupported x402 version {got}")]
    Version { got: u32 },
}

/// Outcome reported by the settlement relay.
///
/// Invariant: `success` implies `payer` is present; the payer address is
/// the sole identity the gateway trusts for shard routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub success: bool,
    /// Settlement transaction id, when submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Network the transfer settled on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// On-chain sender of the transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    /// Relay-provided failure reason, fed to the taxonomy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl SettlementResult {
    /// Encodes the receipt for the `payment-response` header.
    pub fn to_header_value(&self) -> String {
        encode_base64_json(self)
    }
}

fn encode_base64_json<T: Serialize>(value: &T) -> String {
    // Serialization of our own wire types cannot fail.
    let json = serde_json::to_vec(value).expect("wire type serializes");
    BASE64.encode(json)
}
