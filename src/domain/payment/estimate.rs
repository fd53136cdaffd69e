//! Price estimates and atomic-amount wire encoding.

use serde::{Deserialize, Serialize};

use super::token::TokenKind;

/// Serde helper: atomic amounts cross the wire as decimal strings, never
/// as JSON numbers, so they survive any client's number precision.
pub mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map_err(|_| de::Error::custom(format!("invalid atomic amount: {raw:?}")))
    }
}

/// The priced outcome of a tier evaluation for one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEstimate {
    /// Amount owed, in atomic units of `token`.
    #[serde(with = "amount_string")]
    pub amount: u128,
    /// Token the amount is denominated in.
    pub token: TokenKind,
    /// Model the estimate was derived from, for dynamic tiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Estimated input tokens, for dynamic tiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_input_tokens: Option<u32>,
    /// Estimated output tokens, for dynamic tiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_output_tokens: Option<u32>,
    /// USD cost before margin.
    pub usd_cost: f64,
    /// USD total after margin and minimum clamp; the figure converted
    /// into `amount`.
    pub usd_total: f64,
}

impl PriceEstimate {
    /// A zero estimate for free tiers.
    pub fn free(token: TokenKind) -> Self {
        Self {
            amount: 0,
            token,
            model: None,
            estimated_input_tokens: None,
            estimated_output_tokens: None,
            usd_cost: 0.0,
            usd_total: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "amount_string")]
        amount: u128,
    }

    #[test]
    fn amount_round_trips_as_decimal_string() {
        let w = Wrapper { amount: 340_282_366_920_938_463_463_374_607_431_768_211_455 };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"amount":"340282366920938463463374607431768211455"}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.amount, w.amount);
    }

    #[test]
    fn amount_rejects_floats_and_garbage() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount":"1.5"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount":"-3"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount":"abc"}"#).is_err());
    }

    #[test]
    fn free_estimate_is_zero() {
        let e = PriceEstimate::free(TokenKind::Stx);
        assert_eq!(e.amount, 0);
        assert_eq!(e.usd_total, 0.0);
    }

    #[test]
    fn estimate_serializes_camel_case() {
        let e = PriceEstimate {
            amount: 1000,
            token: TokenKind::Stx,
            model: Some("test/model".into()),
            estimated_input_tokens: Some(1),
            estimated_output_tokens: Some(2),
            usd_cost: 0.0005,
            usd_total: 0.001,
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["amount"], "1000");
        assert_eq!(v["token"], "STX");
        assert_eq!(v["estimatedInputTokens"], 1);
    }
}
