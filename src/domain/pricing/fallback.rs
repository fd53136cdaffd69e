//! Compiled-in model price table.
//!
//! Used when the model catalog cache has no snapshot (cold start, upstream
//! outage). Prices are USD per 1k tokens; verify periodically against the
//! provider's model pages.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::domain::catalog::ModelPricing;

/// Pricing applied when a model is absent from both the catalog and this
/// table while the catalog is unavailable.
pub const DEFAULT_PRICING: ModelPricing = ModelPricing {
    prompt_per_k: 0.001,
    completion_per_k: 0.005,
};

static FALLBACK: Lazy<HashMap<&'static str, ModelPricing>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let mut add = |id: &'static str, prompt: f64, completion: f64| {
        map.insert(id, ModelPricing { prompt_per_k: prompt, completion_per_k: completion });
    };

    // Claude 3.5 Haiku: $0.80/1M in, $4.00/1M out
    add("anthropic/claude-3-5-haiku", 0.0008, 0.004);
    // Claude 3.5 Sonnet: $3.00/1M in, $15.00/1M out
    add("anthropic/claude-3-5-sonnet", 0.003, 0.015);
    // GPT-4o-mini: $0.15/1M in, $0.60/1M out
    add("openai/gpt-4o-mini", 0.00015, 0.0006);
    // GPT-4o: $2.50/1M in, $10.00/1M out
    add("openai/gpt-4o", 0.0025, 0.01);
    // Llama 3.1 8B: $0.05/1M in, $0.08/1M out
    add("meta-llama/llama-3.1-8b-instruct", 0.00005, 0.00008);
    // Llama 3.1 70B: $0.30/1M in, $0.40/1M out
    add("meta-llama/llama-3.1-70b-instruct", 0.0003, 0.0004);
    // Mistral Nemo: $0.035/1M in, $0.08/1M out
    add("mistralai/mistral-nemo", 0.000035, 0.00008);

    map
});

/// Looks up a model in the compiled-in table.
pub fn lookup(model: &str) -> Option<ModelPricing> {
    FALLBACK.get(model).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_resolve() {
        let p = lookup("anthropic/claude-3-5-haiku").unwrap();
        assert!((p.prompt_per_k - 0.0008).abs() < 1e-12);
        assert!((p.completion_per_k - 0.004).abs() < 1e-12);
    }

    #[test]
    fn unknown_models_miss() {
        assert!(lookup("vendor/nonexistent-model").is_none());
    }
}
