//! Priority queue endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{json, Value};

use super::super::helpers::{
    decode_json, ok_response, payer_shard, shard_error_response, RequirePayer,
};
use super::super::state::AppState;

#[derive(Deserialize)]
struct PushRequest {
    queue: String,
    items: Vec<Value>,
    #[serde(default)]
    priority: i64,
}

/// POST /storage/queue/push
pub async fn push(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: PushRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard
        .queue_push(&request.queue, &request.items, request.priority)
        .await
    {
        Ok(pushed) => ok_response(
            payer.token,
            json!({ "queue": request.queue, "pushed": pushed }),
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
struct DrainRequest {
    queue: String,
    #[serde(default = "default_count")]
    count: u32,
}

fn default_count() -> u32 {
    1
}

/// POST /storage/queue/pop
pub async fn pop(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: DrainRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.queue_pop(&request.queue, request.count).await {
        Ok(jobs) => {
            let count = jobs.len();
            ok_response(
                payer.token,
                json!({ "queue": request.queue, "jobs": jobs, "count": count }),
            )
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// POST /storage/queue/peek
pub async fn peek(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: DrainRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.queue_peek(&request.queue, request.count).await {
        Ok(jobs) => {
            let count = jobs.len();
            ok_response(
                payer.token,
                json!({ "queue": request.queue, "jobs": jobs, "count": count }),
            )
        }
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
struct StatusRequest {
    queue: String,
}

/// POST /storage/queue/status
pub async fn status(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: StatusRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.queue_status(&request.queue).await {
        Ok(status) => ok_response(
            payer.token,
            json!({ "queue": request.queue, "status": status }),
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}

#[derive(Deserialize)]
struct ClearRequest {
    queue: String,
    #[serde(default)]
    status: Option<String>,
}

/// POST /storage/queue/clear
pub async fn clear(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: ClearRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard
        .queue_clear(&request.queue, request.status.as_deref())
        .await
    {
        Ok(removed) => ok_response(
            payer.token,
            json!({ "queue": request.queue, "removed": removed }),
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}
