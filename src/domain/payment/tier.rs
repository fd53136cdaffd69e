//! Price tiers and per-endpoint price specifications.

use serde::{Deserialize, Serialize};

/// How an endpoint is priced.
///
/// `Free` bypasses the payment state machine entirely. `Standard` is a
/// fixed amount in micro-STX converted per token at challenge time.
/// `Dynamic` resolves an estimator against the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSpec {
    Free,
    /// Fixed price in micro-STX.
    Standard { ustx: u64 },
    /// Per-request estimate derived from the chat body.
    Dynamic { estimator: EstimatorId },
}

impl PriceSpec {
    pub fn is_free(&self) -> bool {
        matches!(self, PriceSpec::Free)
    }

    /// Tier name used in challenge `extra` metadata and usage records.
    pub fn tier_name(&self) -> &'static str {
        match self {
            PriceSpec::Free => "free",
            PriceSpec::Standard { .. } => "standard",
            PriceSpec::Dynamic { .. } => "dynamic",
        }
    }

    /// Transfer timeout advertised in the challenge. Dynamic quotes get a
    /// longer window because the client must sign the exact quoted amount.
    pub fn timeout_seconds(&self) -> u64 {
        match self {
            PriceSpec::Dynamic { .. } => 120,
            _ => 60,
        }
    }
}

/// Statically registered dynamic estimators.
///
/// Dynamic dispatch over estimator closures becomes a closed enum here:
/// registration is compile-time and the payment middleware matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorId {
    /// Chat completion priced from the model catalog.
    ChatCompletion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_names() {
        assert_eq!(PriceSpec::Free.tier_name(), "free");
        assert_eq!(PriceSpec::Standard { ustx: 1000 }.tier_name(), "standard");
        assert_eq!(
            PriceSpec::Dynamic { estimator: EstimatorId::ChatCompletion }.tier_name(),
            "dynamic"
        );
    }

    #[test]
    fn dynamic_tier_gets_longer_timeout() {
        assert_eq!(PriceSpec::Standard { ustx: 1000 }.timeout_seconds(), 60);
        assert_eq!(
            PriceSpec::Dynamic { estimator: EstimatorId::ChatCompletion }.timeout_seconds(),
            120
        );
    }

    #[test]
    fn only_free_is_free() {
        assert!(PriceSpec::Free.is_free());
        assert!(!PriceSpec::Standard { ustx: 1 }.is_free());
    }
}
