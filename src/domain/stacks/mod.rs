//! Stacks chain utilities: c32 addresses, Clarity decoding, transaction
//! envelope summaries, signature verification.

pub mod c32;
pub mod clarity;
pub mod signature;
pub mod transaction;
