//! Distributed lock endpoints.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use super::super::helpers::{
    decode_json, error_response, ok_response, payer_shard, shard_error_response, RequirePayer,
};
use super::super::state::AppState;

#[derive(Deserialize)]
struct LockRequest {
    name: String,
    #[serde(default)]
    ttl: Option<i64>,
}

/// POST /storage/sync/lock
pub async fn lock(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: LockRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.lock_acquire(&request.name, request.ttl).await {
        Ok(outcome) => ok_response(payer.token, json!({ "name": request.name, "lock": outcome })),
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
struct UnlockRequest {
    name: String,
    token: String,
}

/// POST /storage/sync/unlock
pub async fn unlock(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: UnlockRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.lock_release(&request.name, &request.token).await {
        Ok(released) => ok_response(
            payer.token,
            json!({ "name": request.name, "released": released }),
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
struct ExtendRequest {
    name: String,
    token: String,
    #[serde(default)]
    ttl: Option<i64>,
}

/// POST /storage/sync/extend
pub async fn extend(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: ExtendRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.lock_extend(&request.name, &request.token, request.ttl).await {
        Ok(Some(expires_at)) => ok_response(
            payer.token,
            json!({ "name": request.name, "extended": true, "expiresAt": expires_at }),
        ),
        Ok(None) => error_response(
            StatusCode::CONFLICT,
            Some(payer.token),
            "NOT_HOLDER",
            "lock is expired or the token does not match",
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// GET /storage/sync/status/:name
pub async fn status(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RequirePayer(payer): RequirePayer,
) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.lock_status(&name).await {
        Ok(Some(info)) => ok_response(
            payer.token,
            json!({ "name": name, "locked": true, "lock": info }),
        ),
        Ok(None) => ok_response(payer.token, json!({ "name": name, "locked": false })),
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// GET /storage/sync/list
pub async fn list(State(state): State<AppState>, RequirePayer(payer): RequirePayer) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.lock_list().await {
        Ok(locks) => {
            let count = locks.len();
            ok_response(payer.token, json!({ "locks": locks, "count": count }))
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}
