//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the gateway and the outside world. Adapters implement these ports.
//!
//! - `SettlementClient` - the external settlement relay (facilitator)
//! - `ChatProvider` - OpenAI-compatible inference upstreams
//! - `ChainLookup` - remote blockchain state lookups
//! - `ContentClassifier` - background content-safety classification
//! - `LogTransport` - append-only remote structured-log sink

mod chain;
mod classifier;
mod inference;
mod logsink;
mod settlement;

pub use chain::{ChainLookup, ChainLookupError};
pub use classifier::{ClassifierError, ContentClassifier, ScanVerdict};
pub use inference::{ChatCompletion, ChatProvider, InferenceError, TokenUsage};
pub use logsink::{LogTransport, LogTransportError};
pub use settlement::{SettlementClient, SettlementError};
