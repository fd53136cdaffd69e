//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the gateway to external systems:
//! - `facilitator` - settlement relay HTTP client
//! - `openrouter` - OpenRouter chat + model catalog source
//! - `cloudflare` - Cloudflare Workers AI chat
//! - `hiro` - blockchain lookups (balances, names)
//! - `classifier` - LLM content-safety classifier
//! - `logsink` - bounded fire-and-forget log shipper
//!
//! Every adapter is stateless except for configuration, sets its
//! timeouts at construction, and converts transport failures into the
//! typed errors of its port. Caching lives elsewhere (the model catalog
//! cache fronts `openrouter`, not the other way around).

mod classifier;
mod cloudflare;
mod facilitator;
mod hiro;
mod logsink;
mod openrouter;

pub use classifier::LlmClassifier;
pub use cloudflare::{CloudflareConfig, CloudflareProvider};
pub use facilitator::{FacilitatorClient, FacilitatorConfig};
pub use hiro::{HiroClient, HiroConfig};
pub use logsink::{HttpLogTransport, LogSink};
pub use openrouter::{OpenRouterConfig, OpenRouterProvider};
