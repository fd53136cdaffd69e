//! Shared request/response helpers for handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::domain::payment::{PriceEstimate, TokenKind};
use crate::domain::pricing::ChatRequest;
use crate::shard::{Shard, ShardError};

use super::state::AppState;

/// Correlation id bound at ingress; present on every request.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

/// Identity bound by the payment middleware after settlement. The payer
/// address is authoritative for the remainder of the request.
#[derive(Debug, Clone)]
pub struct PayerIdentity {
    pub address: String,
    pub token: TokenKind,
    pub estimate: PriceEstimate,
    pub transaction: Option<String>,
}

/// Chat body parsed once by the payment middleware for dynamic
/// endpoints; handlers read it from here, never from the wire.
#[derive(Debug, Clone)]
pub struct CachedChat(pub Arc<ChatRequest>);

/// Uniform error body: `{ok: false, tokenType, error, ...extra}`.
pub fn error_response(
    status: StatusCode,
    token: Option<TokenKind>,
    error: &str,
    message: impl Into<String>,
) -> Response {
    let body = json!({
        "ok": false,
        "tokenType": token.map(|t| t.wire_name()),
        "error": error,
        "message": message.into(),
    });
    (status, Json(body)).into_response()
}

/// Maps a shard failure into the uniform error body.
pub fn shard_error_response(token: TokenKind, err: ShardError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = if status == StatusCode::BAD_REQUEST { "INVALID_REQUEST" } else { "STORAGE_ERROR" };
    if status.is_server_error() {
        tracing::error!(error = %err, "shard operation failed");
    }
    error_response(status, Some(token), code, err.to_string())
}

/// Success body: `{ok: true, tokenType, ...data}`.
pub fn ok_response(token: TokenKind, data: Value) -> Response {
    let mut body = json!({
        "ok": true,
        "tokenType": token.wire_name(),
    });
    if let (Value::Object(target), Value::Object(extra)) = (&mut body, data) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
    Json(body).into_response()
}

/// Parses a JSON body with a typed 400 on malformed input.
pub fn decode_json<T: DeserializeOwned>(
    token: Option<TokenKind>,
    bytes: &[u8],
) -> Result<T, Response> {
    serde_json::from_slice(bytes).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            token,
            "INVALID_REQUEST",
            format!("malformed body: {e}"),
        )
    })
}

/// Resolves the caller's shard; 500 when called without a payment
/// context having bound an identity.
pub async fn payer_shard(state: &AppState, payer: &PayerIdentity) -> Result<Shard, Response> {
    state.shards.shard_for(&payer.address).await.map_err(|e| {
        tracing::error!(error = %e, payer = %payer.address, "shard resolution failed");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some(payer.token),
            "STORAGE_ERROR",
            "failed to open payer shard",
        )
    })
}

/// Extractor that requires a settled payment context.
///
/// The payment middleware inserts [`PayerIdentity`] after settlement;
/// reaching a handler without one is a wiring bug and surfaces as 500.
#[derive(Debug, Clone)]
pub struct RequirePayer(pub PayerIdentity);

impl<S> axum::extract::FromRequestParts<S> for RequirePayer
where
    S: Send + Sync,
{
    type Rejection = MissingPaymentContext;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<PayerIdentity>()
                .cloned()
                .map(RequirePayer)
                .ok_or(MissingPaymentContext)
        })
    }
}

/// Rejection for handlers invoked without a bound payer.
#[derive(Debug, Clone, Copy)]
pub struct MissingPaymentContext;

impl IntoResponse for MissingPaymentContext {
    fn into_response(self) -> Response {
        tracing::error!("handler reached without payment context");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            "INTERNAL_ERROR",
            "payment context missing",
        )
    }
}
