//! Stacks utility endpoints: address decoding, Clarity and transaction
//! decoding, profile lookup, signature verification.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::domain::stacks::c32::c32_address_decode;
use crate::domain::stacks::clarity::decode_clarity_value;
use crate::domain::stacks::signature;
use crate::domain::stacks::transaction::decode_transaction as decode_tx;

use super::super::helpers::{decode_json, error_response, ok_response, RequirePayer};
use super::super::state::AppState;

fn hex_input(token: crate::domain::payment::TokenKind, value: &str) -> Result<Vec<u8>, Response> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            Some(token),
            "INVALID_REQUEST",
            "value is not valid hex",
        )
    })
}

/// GET /stacks/address/:address
pub async fn address_info(
    Path(address): Path<String>,
    RequirePayer(payer): RequirePayer,
) -> Response {
    match c32_address_decode(&address) {
        Ok(decoded) => ok_response(
            payer.token,
            json!({
                "address": address,
                "valid": true,
                "network": if decoded.is_mainnet() { "mainnet" } else { "testnet" },
                "type": decoded.kind(),
                "version": decoded.version,
                "hash160": hex::encode(decoded.hash160),
            }),
        ),
        Err(e) => ok_response(
            payer.token,
            json!({
                "address": address,
                "valid": false,
                "reason": e.to_string(),
            }),
        ),
    }
}

#[derive(Deserialize)]
struct DecodeClarityRequest {
    #[serde(alias = "clarityValue")]
    value: String,
}

/// POST /stacks/decode/clarity
pub async fn decode_clarity(RequirePayer(payer): RequirePayer, body: Bytes) -> Response {
    let request: DecodeClarityRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let bytes = match hex_input(payer.token, &request.value) {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match decode_clarity_value(&bytes) {
        Ok(decoded) => ok_response(payer.token, json!({ "decoded": decoded })),
        Err(e) => error_response(
            StatusCode::BAD_REQUEST,
            Some(payer.token),
            "INVALID_REQUEST",
            format!("clarity decode failed: {e}"),
        ),
    }
}

#[derive(Deserialize)]
struct DecodeTransactionRequest {
    transaction: String,
}

/// POST /stacks/decode/transaction
pub async fn decode_transaction(RequirePayer(payer): RequirePayer, body: Bytes) -> Response {
    let request: DecodeTransactionRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let bytes = match hex_input(payer.token, &request.transaction) {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match decode_tx(&bytes) {
        Ok(summary) => ok_response(payer.token, json!({ "transaction": summary })),
        Err(e) => error_response(
            StatusCode::BAD_REQUEST,
            Some(payer.token),
            "INVALID_REQUEST",
            format!("transaction decode failed: {e}"),
        ),
    }
}

/// GET /stacks/profile/:address
pub async fn profile(
    State(state): State<AppState>,
    Path(address): Path<String>,
    RequirePayer(payer): RequirePayer,
) -> Response {
    if c32_address_decode(&address).is_err() {
        return error_response(
            StatusCode::BAD_REQUEST,
            Some(payer.token),
            "INVALID_REQUEST",
            "not a valid Stacks address",
        );
    }

    let Some(chain) = &state.chain else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            Some(payer.token),
            "NOT_CONFIGURED",
            "chain lookups are not configured",
        );
    };

    match chain.profile(&address).await {
        Ok(profile) => ok_response(payer.token, json!({ "profile": profile })),
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            error_response(status, Some(payer.token), "LOOKUP_FAILED", e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct VerifyMessageRequest {
    message: String,
    signature: String,
    address: String,
}

/// POST /stacks/verify/message
pub async fn verify_message(RequirePayer(payer): RequirePayer, body: Bytes) -> Response {
    let request: VerifyMessageRequest = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let signature_bytes = match hex_input(payer.token, &request.signature) {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match signature::verify_message(
        request.message.as_bytes(),
        &signature_bytes,
        &request.address,
    ) {
        Ok(valid) => ok_response(
            payer.token,
            json!({ "valid": valid, "address": request.address }),
        ),
        Err(e) => error_response(
            StatusCode::BAD_REQUEST,
            Some(payer.token),
            "INVALID_REQUEST",
            e.to_string(),
        ),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifySip018Request {
    /// Clarity-serialized domain tuple, hex.
    domain: String,
    /// Clarity-serialized message value, hex.
    message: String,
    signature: String,
    public_key: String,
}

/// POST /stacks/verify/sip018
pub async fn verify_sip018(RequirePayer(payer): RequirePayer, body: Bytes) -> Response {
    let request: VerifySip018Request = match decode_json(Some(payer.token), &body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let domain = match hex_input(payer.token, &request.domain) {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };
    let message = match hex_input(payer.token, &request.message) {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };
    let signature_bytes = match hex_input(payer.token, &request.signature) {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };
    let public_key = match hex_input(payer.token, &request.public_key) {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match signature::verify_sip018(&domain, &message, &signature_bytes, &public_key) {
        Ok(valid) => ok_response(
            payer.token,
            json!({
                "valid": valid,
                "structuredDataHash": hex::encode(signature::sip018_hash(&domain, &message)),
            }),
        ),
        Err(e) => error_response(
            StatusCode::BAD_REQUEST,
            Some(payer.token),
            "INVALID_REQUEST",
            e.to_string(),
        ),
    }
}
