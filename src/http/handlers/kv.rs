//! Key-value storage endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::shard::{KvSetOptions, ScanContentType};

use super::super::helpers::{
    decode_json, error_response, ok_response, payer_shard, shard_error_response, RequirePayer,
};
use super::super::state::AppState;

#[derive(Deserialize)]
struct SetRequest {
    key: String,
    value: Value,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    ttl: Option<i64>,
}

/// POST /storage/kv
pub async fn set(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: SetRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    let options = KvSetOptions { metadata: request.metadata, ttl_secs: request.ttl };
    match shard.kv_set(&request.key, request.value.clone(), options).await {
        Ok(outcome) => {
            // Stored user content gets a background safety scan.
            if let Some(text) = request.value.as_str() {
                state.scanner.schedule(
                    shard.clone(),
                    format!("kv:{}", request.key),
                    ScanContentType::Kv,
                    text.to_string(),
                );
            }
            ok_response(
                payer.token,
                json!({
                    "key": request.key,
                    "created": outcome.created,
                    "expiresAt": outcome.expires_at,
                }),
            )
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// GET /storage/kv/:key
pub async fn get(
    State(state): State<AppState>,
    Path(key): Path<String>,
    RequirePayer(payer): RequirePayer,
) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.kv_get(&key).await {
        Ok(Some(entry)) => ok_response(payer.token, json!({ "entry": entry })),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            Some(payer.token),
            "NOT_FOUND",
            format!("no value under key: {key}"),
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// DELETE /storage/kv/:key
pub async fn delete(
    State(state): State<AppState>,
    Path(key): Path<String>,
    RequirePayer(payer): RequirePayer,
) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.kv_delete(&key).await {
        Ok(deleted) => ok_response(payer.token, json!({ "key": key, "deleted": deleted })),
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// GET /storage/kv
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    RequirePayer(payer): RequirePayer,
) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.kv_list(query.prefix.as_deref(), query.limit).await {
        Ok(entries) => {
            let count = entries.len();
            ok_response(payer.token, json!({ "entries": entries, "count": count }))
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}
