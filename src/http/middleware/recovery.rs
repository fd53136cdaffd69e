//! Panic recovery middleware.
//!
//! A panicking handler must not tear down the process. The handler
//! future runs under `catch_unwind`; a panic becomes a 500 carrying the
//! correlation id, and the payload is logged.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;

use super::super::helpers::CorrelationId;

pub async fn recovery_middleware(request: Request, next: Next) -> Response {
    let correlation = request
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(request_id = %correlation, panic = %message, "handler panicked");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "ok": false,
                    "error": "INTERNAL_ERROR",
                    "message": "internal server error",
                    "requestId": correlation,
                })),
            )
                .into_response()
        }
    }
}
