//! Inference endpoints: OpenAI-compatible chat over OpenRouter
//! (dynamic tier) and Cloudflare Workers AI (standard tier), plus the
//! free model list.

use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::domain::pricing::ChatRequest;
use crate::ports::{ChatCompletion, ChatProvider, InferenceError};

use super::super::helpers::{decode_json, error_response, CachedChat, RequirePayer};
use super::super::state::AppState;

fn completion_response(payer_token: &str, completion: ChatCompletion) -> Response {
    Json(json!({
        "id": completion.id,
        "object": "chat.completion",
        "model": completion.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": completion.content},
            "finish_reason": completion.finish_reason,
        }],
        "usage": completion.usage.map(|u| json!({
            "prompt_tokens": u.prompt_tokens,
            "completion_tokens": u.completion_tokens,
            "total_tokens": u.total(),
        })),
        "tokenType": payer_token,
    }))
    .into_response()
}

fn inference_error(token: crate::domain::payment::TokenKind, e: InferenceError) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    if status.is_server_error() {
        tracing::warn!(error = %e, "inference upstream failure");
    }
    let mut response = error_response(status, Some(token), "INFERENCE_FAILED", e.to_string());
    if let InferenceError::RateLimited { retry_after_secs } = e {
        response
            .headers_mut()
            .insert("retry-after", axum::http::HeaderValue::from(retry_after_secs));
    }
    response
}

async fn run_chat(
    provider: &dyn ChatProvider,
    token: crate::domain::payment::TokenKind,
    request: &ChatRequest,
) -> Response {
    match provider.complete(request).await {
        Ok(completion) => completion_response(token.wire_name(), completion),
        Err(e) => inference_error(token, e),
    }
}

/// POST /inference/openrouter/chat (dynamic tier)
///
/// The body was parsed once by the payment middleware and rides in the
/// request extensions.
pub async fn openrouter_chat(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    Extension(CachedChat(chat)): Extension<CachedChat>,
) -> Response {
    let Some(provider) = &state.openrouter else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            Some(payer.token),
            "NOT_CONFIGURED",
            "OpenRouter is not configured",
        );
    };
    run_chat(provider.as_ref(), payer.token, &chat).await
}

/// POST /inference/cloudflare/chat (standard tier)
pub async fn cloudflare_chat(
    State(state): State<AppState>,
    RequirePayer(payer): RequirePayer,
    body: Bytes,
) -> Response {
    let chat: ChatRequest = match decode_json(Some(payer.token), &body) {
        Ok(chat) => chat,
        Err(response) => return response,
    };
    if chat.stream {
        return error_response(
            StatusCode::BAD_REQUEST,
            Some(payer.token),
            "INVALID_REQUEST",
            "streaming is not supported on the paid path",
        );
    }

    let Some(provider) = &state.cloudflare else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            Some(payer.token),
            "NOT_CONFIGURED",
            "Cloudflare Workers AI is not configured",
        );
    };
    run_chat(provider.as_ref(), payer.token, &chat).await
}

/// GET /inference/openrouter/models (free)
pub async fn openrouter_models(State(state): State<AppState>) -> Response {
    let models = state.catalog.models().await;
    Json(json!({
        "ok": true,
        "models": models,
        "count": models.len(),
    }))
    .into_response()
}
