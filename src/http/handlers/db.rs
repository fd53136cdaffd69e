//! SQL sandbox endpoints.

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
struct SqlRequest {
    #[serde(alias = "query", alias = "statement")]
    sql: String,
    #[serde(default)]
    params: Vec<Value>,
}

/// POST /storage/db/query
pub async fn query(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: SqlRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.sql_query(&request.sql, &request.params).await {
        Ok(output) => ok_response(
            payer.token,
            json!({
                "rows": output.rows,
                "rowCount": output.row_count,
                "columns": output.columns,
            }),
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// POST /storage/db/execute
pub async fn execute(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let request: SqlRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.sql_execute(&request.sql, &request.params).await {
        Ok(output) => ok_response(
            payer.token,
            json!({ "rowsAffected": output.rows_affected }),
        ),
        Err(e) => shard_error_response(payer.token, e),
    }
}

/// GET /storage/db/schema
pub async fn schema(State(state): State<AppState>, RequirePayer(payer): RequirePayer) -> Response {
    let shard = match payer_shard(&state, &payer).await {
        Ok(shard) => shard,
        Err(response) => return response,
    };

    match shard.sql_schema().await {
        Ok(tables) => ok_response(payer.token, json!({ "tables": tables })),
        Err(e) => shard_error_response(payer.token, e),
    }
}
