//! The payment state machine.
//!
//! Attached per-route by the dispatcher with the route's declared tier.
//! Per request: derive the price, emit a 402 challenge when no payment
//! header is present, decode and validate the signed payload on retry,
//! settle through the relay, classify failures into the retry-aware
//! taxonomy, and bind payer identity for the handler. The settlement
//! receipt is attached to the response whatever the handler's own
//! status: payment was executed, and post-payment compute failures are
//! the handler's to report.
//!
//! ```text
//! START -> DERIVE_PRICE -> {FREE -> HANDLER}
//!                       -> CHALLENGE (no payment header) -> 402
//!                       -> DECODE -> INVALID_PAYLOAD -> 400
//!                                 -> SETTLE -> CLASSIFY
//!                                   -> FATAL / RETRYABLE -> error
//!                                   -> SUCCESS -> HANDLER -> RECEIPT
//! ```

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use crate::domain::catalog::ModelPricing;
use crate::domain::payment::{
    classify_relay_error, Classified, FailureKind, PaymentPayload, PaymentRequired,
    PaymentRequirements, PriceEstimate, PriceSpec, SettlementResult, TokenKind, SCHEME_EXACT,
};
use crate::domain::pricing::{ChatRequest, PricingError};
use crate::ports::SettlementError;

use super::super::helpers::{error_response, CachedChat, PayerIdentity};
use super::super::registry::EndpointSpec;
use super::super::state::AppState;

/// Challenge header, server to client.
pub const HEADER_PAYMENT_REQUIRED: &str = "payment-required";
/// Signed payload header, client to server.
pub const HEADER_PAYMENT_SIGNATURE: &str = "payment-signature";
/// Legacy signed payload header.
pub const HEADER_PAYMENT_LEGACY: &str = "x-payment";
/// Receipt header, server to client.
pub const HEADER_PAYMENT_RESPONSE: &str = "payment-response";
/// Legacy receipt header.
pub const HEADER_PAYMENT_RESPONSE_LEGACY: &str = "x-payment-response";
/// Token selector header.
pub const HEADER_TOKEN_TYPE: &str = "payment-token-type";
/// Payer echo header.
pub const HEADER_PAYER_ADDRESS: &str = "x-payer-address";

/// Max body size buffered for dynamic pricing (1 MiB).
const MAX_DYNAMIC_BODY: usize = 1024 * 1024;

/// Per-route middleware state: the endpoint's spec plus shared deps.
#[derive(Clone)]
pub struct PaymentPolicy {
    pub spec: EndpointSpec,
    pub state: AppState,
}

/// Tokens the gateway can quote on this network: native always, bridged
/// tokens only where a contract exists.
pub fn supported_tokens(state: &AppState) -> Vec<TokenKind> {
    let network = state.config.network.network;
    TokenKind::ALL
        .into_iter()
        .filter(|token| matches!(token, TokenKind::Stx) || token.contract(network).is_some())
        .collect()
}

/// Builds one payment requirement for an estimate.
pub fn requirement_for(
    state: &AppState,
    spec: &EndpointSpec,
    estimate: &PriceEstimate,
    resource: &str,
) -> PaymentRequirements {
    let network = state.config.network.network;
    let mut extra = json!({
        "tier": spec.tier.tier_name(),
        "estimate": estimate,
    });
    if let Some(schema) = spec.schema {
        extra["bazaar"] = schema();
    }

    PaymentRequirements {
        scheme: SCHEME_EXACT.to_string(),
        network: network.chain_id().to_string(),
        max_amount_required: estimate.amount,
        resource: resource.to_string(),
        description: spec.description.to_string(),
        mime_type: "application/json".to_string(),
        pay_to: state.config.network.recipient.clone(),
        max_timeout_seconds: spec.tier.timeout_seconds(),
        asset: estimate.token.asset_identifier(network),
        extra,
    }
}

fn estimate_for(
    state: &AppState,
    spec: &EndpointSpec,
    token: TokenKind,
    chat: Option<(&ChatRequest, &ModelPricing)>,
) -> PriceEstimate {
    match (&spec.tier, chat) {
        (PriceSpec::Standard { ustx }, _) => state.pricing.fixed_estimate(*ustx, token),
        (PriceSpec::Dynamic { .. }, Some((request, pricing))) => {
            state.pricing.chat_estimate(request, pricing, token)
        }
        _ => PriceEstimate::free(token),
    }
}

/// Reads the client's token selection; header wins over query.
fn select_token(request: &Request) -> Result<TokenKind, Response> {
    let raw = request
        .headers()
        .get(HEADER_TOKEN_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            request.uri().query().and_then(|query| {
                query.split('&').find_map(|pair| {
                    pair.strip_prefix("tokenType=").map(str::to_string)
                })
            })
        });

    match raw {
        None => Ok(TokenKind::Stx),
        Some(raw) => TokenKind::parse(&raw).ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                None,
                "INVALID_TOKEN_TYPE",
                format!("unknown token type: {raw}"),
            )
        }),
    }
}

fn payment_header(request: &Request) -> Option<String> {
    request
        .headers()
        .get(HEADER_PAYMENT_SIGNATURE)
        .or_else(|| request.headers().get(HEADER_PAYMENT_LEGACY))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn challenge_response(
    state: &AppState,
    spec: &EndpointSpec,
    resource: &str,
    chat: Option<(&ChatRequest, &ModelPricing)>,
) -> Response {
    let accepts: Vec<PaymentRequirements> = supported_tokens(state)
        .into_iter()
        .map(|token| estimate_for(state, spec, token, chat))
        .filter(|estimate| estimate.amount > 0)
        .map(|estimate| requirement_for(state, spec, &estimate, resource))
        .collect();

    let challenge = PaymentRequired::new(accepts);
    let header = challenge.to_header_value();

    let mut response = (StatusCode::PAYMENT_REQUIRED, Json(&challenge)).into_response();
    if let Ok(value) = HeaderValue::from_str(&header) {
        response.headers_mut().insert(HEADER_PAYMENT_REQUIRED, value);
    }
    response
}

fn classified_response(token: TokenKind, classified: Classified, detail: &str) -> Response {
    let status =
        StatusCode::from_u16(classified.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = error_response(status, Some(token), classified.kind.as_str(), detail);
    if let Some(seconds) = classified.retry_after {
        response
            .headers_mut()
            .insert("retry-after", HeaderValue::from(seconds));
    }
    response
}

/// The middleware entry point.
pub async fn payment_middleware(
    State(policy): State<PaymentPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let state = &policy.state;
    let spec = &policy.spec;
    state.metrics.record_request();

    // FREE: no payment machinery at all.
    if spec.tier.is_free() {
        return next.run(request).await;
    }

    let token = match select_token(&request) {
        Ok(token) => token,
        Err(response) => return response,
    };
    if !supported_tokens(state).contains(&token) {
        return error_response(
            StatusCode::BAD_REQUEST,
            Some(token),
            "INVALID_TOKEN_TYPE",
            format!("{token} is not available on {}", state.config.network.network),
        );
    }

    let resource = state.config.network.resource_url(request.uri().path());

    // DERIVE_PRICE. Dynamic tiers consume the body exactly once; the
    // parsed chat request rides in extensions so the handler never
    // re-parses.
    let (mut request, chat_context) = match &spec.tier {
        PriceSpec::Dynamic { .. } => {
            let (parts, body) = request.into_parts();
            let bytes = match axum::body::to_bytes(body, MAX_DYNAMIC_BODY).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        Some(token),
                        "INVALID_REQUEST",
                        "body too large or unreadable",
                    )
                }
            };
            let chat: ChatRequest = match serde_json::from_slice(&bytes) {
                Ok(chat) => chat,
                Err(e) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        Some(token),
                        "INVALID_REQUEST",
                        format!("malformed chat request: {e}"),
                    )
                }
            };
            if chat.stream {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    Some(token),
                    "INVALID_REQUEST",
                    "streaming is not supported on the paid path",
                );
            }
            let pricing = match state
                .pricing
                .resolve_model_pricing(&state.catalog, &chat.model)
                .await
            {
                Ok(pricing) => pricing,
                Err(PricingError::UnknownModel(model)) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        Some(token),
                        "INVALID_REQUEST",
                        format!("unknown model: {model}"),
                    )
                }
            };

            let chat = Arc::new(chat);
            let mut request = Request::from_parts(parts, Body::from(bytes));
            request.extensions_mut().insert(CachedChat(chat.clone()));
            (request, Some((chat, pricing)))
        }
        _ => (request, None),
    };

    let chat_ref = chat_context
        .as_ref()
        .map(|(chat, pricing)| (chat.as_ref(), pricing));
    let estimate = estimate_for(state, spec, token, chat_ref);

    // CHALLENGE: no payment header on this hit.
    let Some(header) = payment_header(&request) else {
        return challenge_response(state, spec, &resource, chat_ref);
    };

    // DECODE.
    let payload = match PaymentPayload::from_header_value(&header) {
        Ok(payload) => payload,
        Err(e) => {
            state.metrics.record_payment_failure();
            return error_response(
                StatusCode::BAD_REQUEST,
                Some(token),
                FailureKind::InvalidPayload.as_str(),
                e.to_string(),
            );
        }
    };

    let requirement = requirement_for(state, spec, &estimate, &resource);
    if payload.scheme != requirement.scheme || payload.network != requirement.network {
        state.metrics.record_payment_failure();
        return error_response(
            StatusCode::BAD_REQUEST,
            Some(token),
            FailureKind::InvalidPayload.as_str(),
            "payload does not match any advertised requirement",
        );
    }

    // SETTLE. The call runs in its own task so a client disconnect
    // cannot cancel a transfer that may still land on chain.
    let settlement = state.settlement.clone();
    let settle_payload = payload.clone();
    let settle_requirement = requirement.clone();
    let settled = tokio::spawn(async move {
        settlement.settle(&settle_payload, &settle_requirement).await
    })
    .await
    .unwrap_or_else(|join_error| {
        Err(SettlementError::Network(format!(
            "settlement task aborted: {join_error}"
        )))
    });

    // CLASSIFY.
    let result: SettlementResult = match settled {
        Err(transport) => {
            state.metrics.record_payment_failure();
            let reason = transport.relay_reason();
            let classified = classify_relay_error(&reason);
            tracing::warn!(reason = %reason, kind = %classified.kind, "settlement transport failure");
            return classified_response(token, classified, &reason);
        }
        Ok(result) if !result.success => {
            state.metrics.record_payment_failure();
            let reason = result
                .error_reason
                .clone()
                .unwrap_or_else(|| "settlement rejected".to_string());
            let classified = classify_relay_error(&reason);
            tracing::info!(reason = %reason, kind = %classified.kind, "settlement rejected");
            return classified_response(token, classified, &reason);
        }
        Ok(result) => result,
    };

    // SUCCESS requires a payer; a relay that settles without telling us
    // who paid has broken its contract.
    let Some(payer_address) = result.payer.clone().filter(|p| !p.is_empty()) else {
        state.metrics.record_payment_failure();
        tracing::error!("relay reported success without a payer address");
        return classified_response(
            token,
            Classified { kind: FailureKind::UnexpectedSettle, status: 500, retry_after: Some(5) },
            "settlement result missing payer",
        );
    };

    // BIND_IDENTITY.
    let identity = PayerIdentity {
        address: payer_address.clone(),
        token,
        estimate: estimate.clone(),
        transaction: result.transaction.clone(),
    };
    request.extensions_mut().insert(identity);

    // HANDLER, then ATTACH_RECEIPT whatever its status.
    let mut response = next.run(request).await;
    let receipt = result.to_header_value();
    if let Ok(value) = HeaderValue::from_str(&receipt) {
        response
            .headers_mut()
            .insert(HEADER_PAYMENT_RESPONSE, value.clone());
        response
            .headers_mut()
            .insert(HEADER_PAYMENT_RESPONSE_LEGACY, value);
    }
    if let Ok(value) = HeaderValue::from_str(&payer_address) {
        response.headers_mut().insert(HEADER_PAYER_ADDRESS, value);
    }

    // Usage recording is asynchronous and best effort: counters may lose
    // an update, the receipt in the response may not.
    let status = response.status().as_u16();
    state
        .metrics
        .record_settled(spec.path, spec.category.as_str(), token.wire_name(), estimate.amount, status);
    state.logsink.submit(json!({
        "event": "settled_request",
        "endpoint": spec.path,
        "category": spec.category.as_str(),
        "token": token.wire_name(),
        "amount": estimate.amount.to_string(),
        "payer": payer_address.clone(),
        "transaction": result.transaction.clone(),
        "status": status,
    }));
    {
        let shards = state.shards.clone();
        let endpoint = spec.path.to_string();
        let category = spec.category.as_str().to_string();
        let amount = estimate.amount;
        let transaction = result.transaction.clone();
        let token_name = token.wire_name().to_string();
        tokio::spawn(async move {
            match shards.shard_for(&payer_address).await {
                Ok(shard) => {
                    if let Err(e) = shard
                        .usage_record(
                            &endpoint,
                            &category,
                            &token_name,
                            amount,
                            transaction.as_deref(),
                        )
                        .await
                    {
                        tracing::debug!(error = %e, "per-payer usage record failed");
                    }
                }
                Err(e) => tracing::debug!(error = %e, "usage shard unavailable"),
            }
        });
    }

    response
}
