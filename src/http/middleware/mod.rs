//! Request middleware: correlation ids, panic recovery, and the payment
//! state machine.

mod correlation;
mod payment;
mod recovery;

pub use correlation::correlation_middleware;
pub use payment::{
    payment_middleware, requirement_for, supported_tokens, PaymentPolicy,
    HEADER_PAYER_ADDRESS, HEADER_PAYMENT_LEGACY, HEADER_PAYMENT_REQUIRED,
    HEADER_PAYMENT_RESPONSE, HEADER_PAYMENT_RESPONSE_LEGACY, HEADER_PAYMENT_SIGNATURE,
    HEADER_TOKEN_TYPE,
};
pub use recovery::recovery_middleware;
