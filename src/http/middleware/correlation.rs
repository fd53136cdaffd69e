//! Correlation-id middleware.
//!
//! Every request gets an id, from the `x-request-id` header when the
//! network layer supplies one, generated otherwise. The id rides in
//! request extensions, every log line via a span field, the response
//! header, and every JSON error body.

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use super::super::helpers::CorrelationId;

/// Error bodies larger than this are passed through untouched.
const MAX_ERROR_BODY: usize = 64 * 1024;

fn acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Stamps the correlation id into a JSON error body.
async fn stamp_error_body(response: Response, id: &str) -> Response {
    let is_json = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        // Oversized or unreadable error body: nothing to stamp.
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    let stamped = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(mut object)) => {
            object
                .entry("requestId")
                .or_insert_with(|| Value::String(id.to_string()));
            serde_json::to_vec(&Value::Object(object)).unwrap_or_else(|_| bytes.to_vec())
        }
        _ => bytes.to_vec(),
    };

    parts.headers.remove(CONTENT_LENGTH);
    if let Ok(value) = HeaderValue::from_str(&stamped.len().to_string()) {
        parts.headers.insert(CONTENT_LENGTH, value);
    }
    Response::from_parts(parts, Body::from(stamped))
}

pub async fn correlation_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|id| acceptable(id))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(CorrelationId(id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        response = stamp_error_body(response, &id).await;
    }
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn header_validation() {
        assert!(acceptable("abc-123_DEF"));
        assert!(acceptable("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!acceptable(""));
        assert!(!acceptable("has spaces"));
        assert!(!acceptable(&"x".repeat(200)));
    }

    #[tokio::test]
    async fn error_bodies_receive_request_id() {
        let response = Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"ok":false,"error":"INVALID_REQUEST"}"#))
            .unwrap();

        let stamped = stamp_error_body(response, "req-1").await;
        let bytes = axum::body::to_bytes(stamped.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["requestId"], "req-1");
        assert_eq!(body["error"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn existing_request_id_is_preserved() {
        let response = Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"ok":false,"requestId":"original"}"#))
            .unwrap();

        let stamped = stamp_error_body(response, "other").await;
        let bytes = axum::body::to_bytes(stamped.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["requestId"], "original");
    }

    #[tokio::test]
    async fn non_json_bodies_pass_through() {
        let response = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("plain text"))
            .unwrap();

        let stamped = stamp_error_body(response, "req-1").await;
        let bytes = axum::body::to_bytes(stamped.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"plain text");
    }
}
