//! Discovery surface: the x402 manifest and agent-facing documents.
//!
//! Everything here is a pure function of the endpoint registry and
//! server configuration; no live network calls. Dynamic tiers advertise
//! their floor quote (the minimum a request can cost), since the real
//! amount depends on the request body.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::domain::payment::{PriceEstimate, PriceSpec, X402_VERSION};
use crate::domain::pricing::DYNAMIC_MINIMUM_USD;

use super::middleware::{requirement_for, supported_tokens};
use super::registry::{endpoint_registry, EndpointSpec};
use super::state::AppState;

fn manifest_estimates(state: &AppState, spec: &EndpointSpec) -> Vec<PriceEstimate> {
    supported_tokens(state)
        .into_iter()
        .map(|token| match &spec.tier {
            PriceSpec::Standard { ustx } => state.pricing.fixed_estimate(*ustx, token),
            PriceSpec::Dynamic { .. } => {
                // Floor quote: every dynamic request costs at least the
                // clamped minimum.
                let amount = state.pricing.convert_usd(DYNAMIC_MINIMUM_USD, token);
                PriceEstimate {
                    amount,
                    token,
                    model: None,
                    estimated_input_tokens: None,
                    estimated_output_tokens: None,
                    usd_cost: DYNAMIC_MINIMUM_USD,
                    usd_total: DYNAMIC_MINIMUM_USD,
                }
            }
            PriceSpec::Free => PriceEstimate::free(token),
        })
        .filter(|estimate| estimate.amount > 0)
        .collect()
}

/// Builds the versioned machine-readable catalog. Free endpoints are
/// excluded; token/tier combinations that price to zero are dropped.
pub fn build_manifest(state: &AppState) -> Value {
    let now = chrono::Utc::now().timestamp();

    let items: Vec<Value> = endpoint_registry()
        .iter()
        .filter(|endpoint| !endpoint.spec.tier.is_free())
        .map(|endpoint| {
            let spec = &endpoint.spec;
            let resource = state.config.network.resource_url(&spec.template());
            let accepts: Vec<Value> = manifest_estimates(state, spec)
                .iter()
                .map(|estimate| {
                    serde_json::to_value(requirement_for(state, spec, estimate, &resource))
                        .expect("requirement serializes")
                })
                .collect();

            let mut item = json!({
                "resource": resource,
                "type": "http",
                "x402Version": X402_VERSION,
                "accepts": accepts,
                "lastUpdated": now,
                "metadata": {
                    "category": spec.category.as_str(),
                    "method": spec.method.to_uppercase(),
                    "description": spec.description,
                    "tier": spec.tier.tier_name(),
                },
            });
            if let Some(schema) = spec.schema {
                item["extensions"] = json!({ "bazaar": schema() });
            }
            item
        })
        .collect();

    json!({
        "x402Version": X402_VERSION,
        "items": items,
    })
}

/// GET /x402.json
pub async fn x402_manifest(State(state): State<AppState>) -> Response {
    Json(build_manifest(&state)).into_response()
}

/// GET /.well-known/agent.json
pub async fn agent_json(State(state): State<AppState>) -> Response {
    let base = &state.config.network.public_base_url;
    Json(json!({
        "name": "stackspay-gateway",
        "description": "Compute and storage endpoints gated by x402 per-request micropayments",
        "url": base,
        "version": env!("CARGO_PKG_VERSION"),
        "payments": {
            "protocol": "x402",
            "version": X402_VERSION,
            "network": state.config.network.network.chain_id(),
            "discovery": state.config.network.resource_url("/x402.json"),
        },
        "interfaces": {
            "openapi": state.config.network.resource_url("/openapi.json"),
            "topics": state.config.network.resource_url("/topics"),
        },
    }))
    .into_response()
}

fn priced_lines(state: &AppState, detailed: bool) -> String {
    endpoint_registry()
        .iter()
        .filter(|endpoint| !endpoint.spec.tier.is_free())
        .map(|endpoint| {
            let spec = &endpoint.spec;
            if detailed {
                let amounts: Vec<String> = manifest_estimates(state, spec)
                    .iter()
                    .map(|e| format!("{} {}", e.amount, e.token.wire_name()))
                    .collect();
                format!(
                    "- {} {} : {} ({} tier; {})",
                    spec.method.to_uppercase(),
                    spec.template(),
                    spec.description,
                    spec.tier.tier_name(),
                    amounts.join(" / "),
                )
            } else {
                format!("- {} {}", spec.method.to_uppercase(), spec.template())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// GET /llms.txt
pub async fn llms_txt(State(state): State<AppState>) -> Response {
    let body = format!(
        "# stackspay-gateway\n\n\
         Pay-per-request compute and storage over the x402 protocol.\n\
         Request any priced endpoint without payment to receive a 402 challenge;\n\
         sign the advertised transfer and retry with the payment-signature header.\n\n\
         Discovery manifest: {}\n\n\
         ## Priced endpoints\n{}\n",
        state.config.network.resource_url("/x402.json"),
        priced_lines(&state, false),
    );
    body.into_response()
}

/// GET /llms-full.txt
pub async fn llms_full_txt(State(state): State<AppState>) -> Response {
    let topics: String = super::handlers::meta::TOPICS
        .iter()
        .map(|(name, description)| format!("### {name}\n{description}\n"))
        .collect::<Vec<_>>()
        .join("\n");

    let body = format!(
        "# stackspay-gateway\n\n\
         Pay-per-request compute and storage over the x402 protocol on {}.\n\
         Payments settle through an external facilitator; the on-chain sender\n\
         of your transfer becomes your storage identity.\n\n\
         ## Topics\n\n{topics}\n\
         ## Priced endpoints\n{}\n",
        state.config.network.network.chain_id(),
        priced_lines(&state, true),
    );
    body.into_response()
}
