//! Classification of settlement relay failures.
//!
//! The relay reports failures as free-form strings. The gateway maps them
//! into a closed taxonomy that fixes the HTTP status and `Retry-After`
//! for each class, so clients can distinguish "sign a new transfer" from
//! "retry the same one later" without parsing prose.

use std::fmt;

/// Closed set of payment failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Relay transport trouble or unclassifiable relay error.
    UnexpectedSettle,
    /// The payer's balance cannot cover the transfer.
    InsufficientFunds,
    /// The signed transfer is stale, failed, or still pending on chain.
    InvalidTransactionState,
    /// The transfer amount is below the quoted requirement.
    AmountInsufficient,
    /// The payload or signature is malformed, or the scheme unsupported.
    InvalidPayload,
    /// The transfer pays a different recipient than required.
    RecipientMismatch,
    /// The transfer's sender does not match the signed payload.
    SenderMismatch,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::UnexpectedSettle => "UNEXPECTED_SETTLE",
            FailureKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            FailureKind::InvalidTransactionState => "INVALID_TRANSACTION_STATE",
            FailureKind::AmountInsufficient => "AMOUNT_INSUFFICIENT",
            FailureKind::InvalidPayload => "INVALID_PAYLOAD",
            FailureKind::RecipientMismatch => "RECIPIENT_MISMATCH",
            FailureKind::SenderMismatch => "SENDER_MISMATCH",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure: taxonomy class, HTTP status, optional
/// `Retry-After` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub kind: FailureKind,
    pub status: u16,
    pub retry_after: Option<u32>,
}

impl Classified {
    const fn new(kind: FailureKind, status: u16, retry_after: Option<u32>) -> Self {
        Self { kind, status, retry_after }
    }
}

/// Maps a relay error string into the taxonomy. First matching condition
/// wins; matching is case-insensitive substring search.
pub fn classify_relay_error(reason: &str) -> Classified {
    use FailureKind::*;

    let r = reason.to_ascii_lowercase();
    let has = |needle: &str| r.contains(needle);

    if has("network") || has("timeout") {
        return Classified::new(UnexpectedSettle, 502, Some(5));
    }
    if has("503") || has("unavailable") {
        return Classified::new(UnexpectedSettle, 503, Some(30));
    }
    if has("insufficient") || has("balance") {
        return Classified::new(InsufficientFunds, 402, None);
    }
    if has("expired") || has("nonce") {
        return Classified::new(InvalidTransactionState, 402, None);
    }
    if has("amount low") || has("below minimum") {
        return Classified::new(AmountInsufficient, 402, None);
    }
    if has("invalid") || has("signature") {
        return Classified::new(InvalidPayload, 400, None);
    }
    if has("recipient mismatch") {
        return Classified::new(RecipientMismatch, 400, None);
    }
    if has("broadcast") {
        return Classified::new(UnexpectedSettle, 502, Some(5));
    }
    if has("tx failed") {
        return Classified::new(InvalidTransactionState, 402, None);
    }
    if has("tx pending") {
        return Classified::new(InvalidTransactionState, 402, Some(10));
    }
    if has("sender mismatch") {
        return Classified::new(SenderMismatch, 400, None);
    }
    if has("unsupported scheme") {
        return Classified::new(InvalidPayload, 400, None);
    }
    Classified::new(UnexpectedSettle, 500, Some(5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable_502() {
        let c = classify_relay_error("network error talking to relay");
        assert_eq!(c.kind, FailureKind::UnexpectedSettle);
        assert_eq!(c.status, 502);
        assert_eq!(c.retry_after, Some(5));

        let c = classify_relay_error("request timeout after 120s");
        assert_eq!(c.status, 502);
    }

    #[test]
    fn unavailable_maps_to_503_with_long_backoff() {
        let c = classify_relay_error("facilitator returned 503");
        assert_eq!(c.status, 503);
        assert_eq!(c.retry_after, Some(30));

        let c = classify_relay_error("service unavailable");
        assert_eq!(c.status, 503);
    }

    #[test]
    fn insufficient_funds_is_client_recoverable_402() {
        let c = classify_relay_error("insufficient funds for transfer");
        assert_eq!(c.kind, FailureKind::InsufficientFunds);
        assert_eq!(c.status, 402);
        assert_eq!(c.retry_after, None);

        let c = classify_relay_error("sender balance too small");
        assert_eq!(c.kind, FailureKind::InsufficientFunds);
    }

    #[test]
    fn stale_transfers_are_402() {
        let c = classify_relay_error("transaction expired");
        assert_eq!(c.kind, FailureKind::InvalidTransactionState);
        assert_eq!(c.status, 402);

        let c = classify_relay_error("bad nonce (stale)");
        assert_eq!(c.kind, FailureKind::InvalidTransactionState);
    }

    #[test]
    fn amount_too_low_is_402() {
        let c = classify_relay_error("amount low");
        assert_eq!(c.kind, FailureKind::AmountInsufficient);

        let c = classify_relay_error("transfer below minimum required");
        assert_eq!(c.kind, FailureKind::AmountInsufficient);
        assert_eq!(c.status, 402);
    }

    #[test]
    fn protocol_violations_are_400() {
        let c = classify_relay_error("invalid payload structure");
        assert_eq!(c.kind, FailureKind::InvalidPayload);
        assert_eq!(c.status, 400);

        let c = classify_relay_error("signature check failed");
        assert_eq!(c.kind, FailureKind::InvalidPayload);

        let c = classify_relay_error("recipient mismatch");
        assert_eq!(c.kind, FailureKind::RecipientMismatch);
        assert_eq!(c.status, 400);

        let c = classify_relay_error("sender mismatch");
        assert_eq!(c.kind, FailureKind::SenderMismatch);

        let c = classify_relay_error("unsupported scheme: lightning");
        assert_eq!(c.kind, FailureKind::InvalidPayload);
    }

    #[test]
    fn broadcast_failure_is_retryable_502() {
        let c = classify_relay_error("broadcast_failed");
        assert_eq!(c.kind, FailureKind::UnexpectedSettle);
        assert_eq!(c.status, 502);
        assert_eq!(c.retry_after, Some(5));
    }

    #[test]
    fn tx_states_split_on_pending() {
        let c = classify_relay_error("tx failed on chain");
        assert_eq!(c.kind, FailureKind::InvalidTransactionState);
        assert_eq!(c.retry_after, None);

        let c = classify_relay_error("tx pending in mempool");
        assert_eq!(c.kind, FailureKind::InvalidTransactionState);
        assert_eq!(c.retry_after, Some(10));
    }

    #[test]
    fn unknown_errors_default_to_500() {
        let c = classify_relay_error("the moon is in the wrong phase");
        assert_eq!(c.kind, FailureKind::UnexpectedSettle);
        assert_eq!(c.status, 500);
        assert_eq!(c.retry_after, Some(5));
    }

    #[test]
    fn classification_is_deterministic() {
        for reason in ["broadcast_failed", "tx pending", "no clue", "insufficient"] {
            assert_eq!(classify_relay_error(reason), classify_relay_error(reason));
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            classify_relay_error("INSUFFICIENT FUNDS").kind,
            FailureKind::InsufficientFunds
        );
        assert_eq!(
            classify_relay_error("Broadcast Failure").kind,
            FailureKind::UnexpectedSettle
        );
    }
}
