//! Paste storage endpoints.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::shard::ScanContentType;

use super::super::helpers::{
    decode_json, error_response, ok_response, payer_shard, shard_error_response, RequirePayer,
};
use super::super::state::AppState;

#[derive(Deserialize)]
struct CreateRequest {
    content: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    ttl: Option<i64>,
}

/// POST /storage/paste
pub async fn create(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: CreateRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard
        .paste_create(
            &request.content,
            request.title.as_deref(),
            request.language.as_deref(),
            request.ttl,
        )
        .await
    {
        Ok(paste) => {
            state.scanner.schedule(
                shard.clone(),
                format!("paste:{}", paste.id),
                ScanContentType::Paste,
                request.content,
            );
            ok_response(
                payer.token,
                json!({
                    "id": paste.id,
                    "createdAt": paste.created_at,
                    "expiresAt": paste.expires_at,
                }),
            )
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// GET /storage/paste/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RequirePayer(payer): RequirePayer,
) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.paste_get(&id).await {
        Ok(Some(paste)) => ok_response(payer.token, json!({ "paste": paste })),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            Some(payer.token),
            "NOT_FOUND",
            format!("no paste with id: {id}"),
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// DELETE /storage/paste/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RequirePayer(payer): RequirePayer,
) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.paste_delete(&id).await {
        Ok(deleted) => ok_response(payer.token, json!({ "id": id, "deleted": deleted })),
        Err(e) => shard_error_response(payer.token, e),
    }
}
