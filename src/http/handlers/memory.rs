//! Vector memory endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::shard::{MemoryItem, ScanContentType};

use super::super::helpers::{
    decode_json, ok_response, payer_shard, shard_error_response, RequirePayer,
};
use super::super::state::AppState;

#[derive(Deserialize)]
struct StoreRequest {
    items: Vec<MemoryItem>,
}

/// POST /storage/memory/store
pub async fn store(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: StoreRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.memory_store(&request.items).await {
        Ok(stored) => {
            for item in &request.items {
                state.scanner.schedule(
                    shard.clone(),
                    format!("memory:{}", item.id),
                    ScanContentType::Memory,
                    item.text.clone(),
                );
            }
            ok_response(payer.token, json!({ "stored": stored }))
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    query_embedding: Vec<f64>,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    threshold: f64,
}

fn default_limit() -> u32 {
    10
}

/// POST /storage/memory/search
pub async fn search(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: SearchRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard
        .memory_search(&request.query_embedding, request.limit, request.threshold)
        .await
    {
        Ok(results) => {
            let count = results.len();
            ok_response(payer.token, json!({ "results": results, "count": count }))
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
struct DeleteRequest {
    ids: Vec<String>,
}

/// POST /storage/memory/delete
pub async fn delete(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: DeleteRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.memory_delete(&request.ids).await {
        Ok(deleted) => ok_response(payer.token, json!({ "deleted": deleted })),
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
struct ListRequest {
    #[serde(default = "default_list_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_list_limit() -> u32 {
    100
}

/// POST /storage/memory/list
pub async fn list(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: ListRequest = if body.is_empty() {
        ListRequest { limit: default_list_limit(), offset: 0 }
    } else {
        match decode_json(Some(payer.token), &body) {
            Ok(request) => request,
            Err(response) => return response,
        }
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.memory_list(request.limit, request.offset).await {
        Ok(items) => {
            let count = items.len();
            ok_response(payer.token, json!({ "items": items, "count": count }))
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// POST /storage/memory/clear
pub async fn clear(State(state): State<AppState>, RequirePayer(payer): RequirePayer) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.memory_clear().await {
        Ok(removed) => ok_response(payer.token, json!({ "removed": removed })),
        Err(e) => shard_error_response(payer.token, e),
    }
}
