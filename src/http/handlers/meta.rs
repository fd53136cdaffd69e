//! Free meta endpoints: banner, health, OpenAPI stub, topics.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::super::state::AppState;

const SERVICE_NAME: &str = "stackspay-gateway";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Topics exposed through the discovery surface.
pub const TOPICS: [(&str, &str); 4] = [
    (
        "hashing",
        "Cryptographic digests (SHA-256, SHA-512, SHA-512/256, Keccak-256, Hash160, \
         RIPEMD-160) computed bit-identically to the on-chain primitives.",
    ),
    (
        "storage",
        "Per-payer isolated storage: key-value with TTL, immutable pastes, a guarded SQL \
         sandbox, distributed locks, priority queues, and vector memory. Your payment is \
         your identity; no other payer can observe your data.",
    ),
    (
        "inference",
        "OpenAI-compatible chat completions. OpenRouter models are priced per request from \
         live catalog prices with a 20% margin; Cloudflare Workers AI is a flat price.",
    ),
    (
        "stacks",
        "Stacks chain utilities: address decoding, Clarity value and transaction decoding, \
         profile lookups, and signature verification.",
    ),
];

/// GET /
pub async fn root(State(state): State<AppState>) -> Response {
    Json(json!({
        "name": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "network": state.config.network.network.chain_id(),
        "payTo": state.config.network.recipient,
        "discovery": "/x402.json",
        "topics": "/topics",
    }))
    .into_response()
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Response {
    Json(json!({
        "ok": true,
        "status": "healthy",
        "version": SERVICE_VERSION,
        "metrics": state.metrics.snapshot(),
    }))
    .into_response()
}

/// GET /openapi.json
///
/// The full OpenAPI document is maintained outside this service; this
/// stub carries enough for version probes.
pub async fn openapi() -> Response {
    Json(json!({
        "openapi": "3.0.0",
        "info": {
            "title": SERVICE_NAME,
            "version": SERVICE_VERSION,
        },
        "paths": {},
    }))
    .into_response()
}

/// GET /topics
pub async fn topics_index() -> Response {
    let names: Vec<&str> = TOPICS.iter().map(|(name, _)| *name).collect();
    Json(json!({ "topics": names })).into_response()
}

/// GET /topics/:topic
pub async fn topic_detail(Path(topic): Path<String>) -> Response {
    match TOPICS.iter().find(|(name, _)| *name == topic) {
        Some((name, description)) => {
            Json(json!({ "topic": name, "description": description })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "ok": false, "error": "NOT_FOUND", "message": "unknown topic" })),
        )
            .into_response(),
    }
}
