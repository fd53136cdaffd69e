//! stackspay-gateway - x402 payment-gated compute and storage.
//!
//! An HTTP gateway that prices each endpoint in blockchain
//! micropayments: unpaid requests receive a 402 challenge, settled
//! payments bind the payer's on-chain address as the identity behind an
//! isolated per-payer storage shard.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod http;
pub mod metrics;
pub mod ports;
pub mod safety;
pub mod shard;
