//! Pricing engine: fixed-tier and dynamic estimates, cross-token
//! conversion, minimum enforcement.
//!
//! All arithmetic ends in atomic `u128` amounts. USD figures are
//! intermediate only and never leave the process except as informational
//! estimate metadata.

mod chat;
pub mod fallback;

pub use chat::{ChatMessage, ChatRequest};

use crate::domain::catalog::{CatalogLookup, ModelCatalog, ModelPricing};
use crate::domain::payment::{PriceEstimate, TokenKind};

/// Margin applied on top of estimated upstream cost for dynamic tiers.
pub const DYNAMIC_MARGIN: f64 = 0.20;

/// Floor for any dynamic quote, in USD.
pub const DYNAMIC_MINIMUM_USD: f64 = 0.001;

/// Output-token estimate when the request does not set `max_tokens`.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Errors from price derivation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// The catalog is populated and does not know this model.
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// Stateless pricing engine. Token rates and decimals come from
/// [`TokenKind`]; the engine owns only the conversion and estimate math.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine;

impl PricingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Fixed-tier estimate: a micro-STX amount converted into `token` at
    /// the fixed USD reference rates, clamped to the token's dust minimum.
    pub fn fixed_estimate(&self, ustx: u64, token: TokenKind) -> PriceEstimate {
        let usd = ustx as f64 / 1e6 * TokenKind::Stx.usd_rate();
        let amount = self.convert_usd(usd, token);
        PriceEstimate {
            amount,
            token,
            model: None,
            estimated_input_tokens: None,
            estimated_output_tokens: None,
            usd_cost: usd,
            usd_total: usd,
        }
    }

    /// Dynamic estimate for a chat request with resolved model pricing.
    ///
    /// Input tokens are estimated as `ceil(chars / 4)`; output tokens as
    /// `min(max_tokens or default, 2 x input)`. A 20% margin and a USD
    /// floor apply before conversion.
    pub fn chat_estimate(
        &self,
        request: &ChatRequest,
        pricing: &ModelPricing,
        token: TokenKind,
    ) -> PriceEstimate {
        let chars = request.total_content_chars();
        let input_tokens = (chars as u32).div_ceil(4);
        let output_cap = request.max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);
        let output_tokens = output_cap.min(input_tokens.saturating_mul(2));

        let cost_usd = input_tokens as f64 * pricing.prompt_per_k / 1000.0
            + output_tokens as f64 * pricing.completion_per_k / 1000.0;
        let usd_total = (cost_usd * (1.0 + DYNAMIC_MARGIN)).max(DYNAMIC_MINIMUM_USD);

        PriceEstimate {
            amount: self.convert_usd(usd_total, token),
            token,
            model: Some(request.model.clone()),
            estimated_input_tokens: Some(input_tokens),
            estimated_output_tokens: Some(output_tokens),
            usd_cost: cost_usd,
            usd_total,
        }
    }

    /// Resolves model pricing through the catalog cache, falling back to
    /// the compiled-in table when the cache has no snapshot.
    ///
    /// A populated catalog that does not list the model is an
    /// [`PricingError::UnknownModel`]; an empty or failed catalog never
    /// rejects.
    pub async fn resolve_model_pricing(
        &self,
        catalog: &ModelCatalog,
        model: &str,
    ) -> Result<ModelPricing, PricingError> {
        match catalog.lookup(model).await {
            CatalogLookup::Valid { pricing: Some(pricing) } => Ok(pricing),
            CatalogLookup::Valid { pricing: None } => {
                Ok(fallback::lookup(model).unwrap_or(fallback::DEFAULT_PRICING))
            }
            CatalogLookup::Invalid { .. } => Err(PricingError::UnknownModel(model.to_string())),
        }
    }

    /// Converts a USD figure into atomic units of `token`, rounding to
    /// the nearest unit and clamping up to the 1-unit dust minimum.
    pub fn convert_usd(&self, usd: f64, token: TokenKind) -> u128 {
        if usd <= 0.0 || !usd.is_finite() {
            return 0;
        }
        let units = usd / token.usd_rate() * 10f64.powi(token.decimals() as i32);
        (units.round() as u128).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PricingEngine {
        PricingEngine::new()
    }

    #[test]
    fn fixed_stx_amount_is_identity() {
        let e = engine().fixed_estimate(1000, TokenKind::Stx);
        assert_eq!(e.amount, 1000);
        assert_eq!(e.token, TokenKind::Stx);
        assert!((e.usd_total - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn fixed_estimate_converts_to_susdt() {
        // 1000 uSTX = $0.0005 = 500 uUSDT
        let e = engine().fixed_estimate(1000, TokenKind::Susdt);
        assert_eq!(e.amount, 500);
    }

    #[test]
    fn fixed_estimate_clamps_sbtc_dust_to_one_sat() {
        // 1000 uSTX = $0.0005 = 0.5 sat, rounds to 1 but never below 1.
        let e = engine().fixed_estimate(1000, TokenKind::Sbtc);
        assert_eq!(e.amount, 1);

        let e = engine().fixed_estimate(1, TokenKind::Sbtc);
        assert_eq!(e.amount, 1);
    }

    #[test]
    fn fixed_estimates_are_deterministic() {
        for token in TokenKind::ALL {
            assert_eq!(
                engine().fixed_estimate(1000, token).amount,
                engine().fixed_estimate(1000, token).amount
            );
        }
    }

    fn chat(content: &str, max_tokens: Option<u32>) -> ChatRequest {
        ChatRequest {
            model: "test/model".into(),
            messages: vec![ChatMessage::user(content)],
            max_tokens,
            temperature: None,
            stream: false,
        }
    }

    #[test]
    fn chat_estimate_matches_reference_scenario() {
        // "hi" = 2 chars -> 1 input token; output = min(default, 2) = 2;
        // cost = 1*0.001/1000 + 2*0.002/1000 = 5e-6; with margin 6e-6;
        // clamped up to the $0.001 floor.
        let pricing = ModelPricing { prompt_per_k: 0.001, completion_per_k: 0.002 };
        let e = engine().chat_estimate(&chat("hi", None), &pricing, TokenKind::Stx);

        assert_eq!(e.estimated_input_tokens, Some(1));
        assert_eq!(e.estimated_output_tokens, Some(2));
        assert!((e.usd_cost - 5e-6).abs() < 1e-12);
        assert!((e.usd_total - DYNAMIC_MINIMUM_USD).abs() < 1e-12);
        // $0.001 at $0.50/STX = 0.002 STX = 2000 uSTX
        assert_eq!(e.amount, 2000);
    }

    #[test]
    fn chat_estimate_respects_max_tokens_cap() {
        let pricing = ModelPricing { prompt_per_k: 0.01, completion_per_k: 0.02 };
        let long = "x".repeat(4000); // 1000 input tokens
        let e = engine().chat_estimate(&chat(&long, Some(100)), &pricing, TokenKind::Stx);
        assert_eq!(e.estimated_input_tokens, Some(1000));
        assert_eq!(e.estimated_output_tokens, Some(100));
    }

    #[test]
    fn chat_estimate_caps_output_at_twice_input() {
        let pricing = ModelPricing { prompt_per_k: 0.01, completion_per_k: 0.02 };
        let e = engine().chat_estimate(&chat("12345678", None), &pricing, TokenKind::Stx);
        // 8 chars -> 2 input tokens -> output min(1024, 4) = 4
        assert_eq!(e.estimated_output_tokens, Some(4));
    }

    #[test]
    fn chat_estimate_above_floor_carries_margin() {
        let pricing = ModelPricing { prompt_per_k: 1.0, completion_per_k: 2.0 };
        let long = "x".repeat(4000); // 1000 input, 1024 output (default cap)
        let e = engine().chat_estimate(&chat(&long, None), &pricing, TokenKind::Susdt);

        let expected_cost = 1000.0 * 1.0 / 1000.0 + 1024.0 * 2.0 / 1000.0;
        assert!((e.usd_cost - expected_cost).abs() < 1e-9);
        assert!((e.usd_total - expected_cost * 1.2).abs() < 1e-9);
        assert_eq!(e.amount, (expected_cost * 1.2 * 1e6).round() as u128);
    }

    #[test]
    fn convert_usd_handles_degenerate_inputs() {
        assert_eq!(engine().convert_usd(0.0, TokenKind::Stx), 0);
        assert_eq!(engine().convert_usd(-1.0, TokenKind::Stx), 0);
        assert_eq!(engine().convert_usd(f64::NAN, TokenKind::Stx), 0);
        assert_eq!(engine().convert_usd(f64::INFINITY, TokenKind::Stx), 0);
    }
}
