//! x402 payment protocol domain: tokens, tiers, wire types, and the
//! failure taxonomy.

mod challenge;
mod estimate;
mod taxonomy;
mod tier;
mod token;

pub use challenge::{
    PaymentPayload, PaymentRequired, PaymentRequirements, PayloadDecodeError, SettlementResult,
    SCHEME_EXACT, X402_VERSION,
};
pub use estimate::{amount_string, PriceEstimate};
pub use taxonomy::{classify_relay_error, Classified, FailureKind};
pub use tier::{EstimatorId, PriceSpec};
pub use token::{AssetContract, StacksNetwork, TokenKind};
