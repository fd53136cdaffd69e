//! Endpoint registry: the single source of truth mapping route and
//! method to tier, handler, and discovery metadata.
//!
//! Each endpoint is one declarative entry. At startup the dispatcher
//! iterates this table to register routes and attach the payment state
//! machine with the declared tier; the discovery manifest is generated
//! from the same entries. Registering the same `(method, path)` twice is
//! a build-time panic.

use axum::routing::MethodRouter;
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::domain::payment::{EstimatorId, PriceSpec};

use super::handlers::{db, hashing, inference, kv, memory, meta, paste, queue, stacks};
// The sync module name collides with std::sync in imports; alias it.
use super::handlers::sync as sync_handlers;
use super::state::AppState;

/// Fixed price for all standard-tier endpoints, in micro-STX.
pub const STANDARD_PRICE_USTX: u64 = 1000;

/// Endpoint category, for discovery grouping and usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Hashing,
    Stacks,
    Inference,
    Storage,
    Meta,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hashing => "hashing",
            Category::Stacks => "stacks",
            Category::Inference => "inference",
            Category::Storage => "storage",
            Category::Meta => "meta",
        }
    }
}

/// Declarative description of one endpoint.
#[derive(Clone)]
pub struct EndpointSpec {
    pub method: &'static str,
    /// Route pattern in router syntax (`:param`).
    pub path: &'static str,
    pub tier: PriceSpec,
    pub category: Category,
    pub description: &'static str,
    /// Optional discovery extension (input/output schemas, examples).
    pub schema: Option<fn() -> Value>,
}

impl EndpointSpec {
    /// Path template in manifest syntax: `{name}` placeholders.
    pub fn template(&self) -> String {
        self.path
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => format!("{{{name}}}"),
                None => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// One registry row: the spec plus its axum handler.
pub struct Endpoint {
    pub spec: EndpointSpec,
    pub handler: MethodRouter<AppState>,
}

fn standard() -> PriceSpec {
    PriceSpec::Standard { ustx: STANDARD_PRICE_USTX }
}

fn hashing_schema() -> Value {
    json!({
        "input": {
            "type": "object",
            "required": ["data"],
            "properties": {
                "data": {"type": "string", "description": "UTF-8 text, or hex when 0x-prefixed"},
                "encoding": {"type": "string", "enum": ["hex", "base64"]}
            }
        },
        "output": {
            "type": "object",
            "properties": {
                "ok": {"type": "boolean"},
                "hash": {"type": "string"},
                "algorithm": {"type": "string"},
                "encoding": {"type": "string"},
                "inputLength": {"type": "integer"}
            }
        },
        "example": {"data": "hello world"}
    })
}

fn chat_schema() -> Value {
    json!({
        "input": {
            "type": "object",
            "required": ["model", "messages"],
            "properties": {
                "model": {"type": "string"},
                "messages": {"type": "array", "items": {"type": "object"}},
                "max_tokens": {"type": "integer"}
            }
        },
        "output": {
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "choices": {"type": "array"}
            }
        }
    })
}

macro_rules! endpoint {
    ($method:ident, $path:literal, $tier:expr, $category:expr, $desc:literal, $handler:expr) => {
        endpoint!($method, $path, $tier, $category, $desc, $handler, None)
    };
    ($method:ident, $path:literal, $tier:expr, $category:expr, $desc:literal, $handler:expr, $schema:expr) => {
        Endpoint {
            spec: EndpointSpec {
                method: stringify!($method),
                path: $path,
                tier: $tier,
                category: $category,
                description: $desc,
                schema: $schema,
            },
            handler: axum::routing::$method($handler),
        }
    };
}

/// The full endpoint table.
pub fn endpoint_registry() -> Vec<Endpoint> {
    use Category::*;

    let dynamic = PriceSpec::Dynamic { estimator: EstimatorId::ChatCompletion };

    let endpoints = vec![
        // Hashing
        endpoint!(
            post, "/hashing/:algorithm", standard(), Hashing,
            "Cryptographic digest of the request data, bit-identical to the on-chain primitive",
            hashing::hash, Some(hashing_schema)
        ),
        // Stacks utilities
        endpoint!(
            get, "/stacks/address/:address", standard(), Stacks,
            "Validate and decode a Stacks address",
            stacks::address_info
        ),
        endpoint!(
            post, "/stacks/decode/clarity", standard(), Stacks,
            "Decode a consensus-serialized Clarity value",
            stacks::decode_clarity
        ),
        endpoint!(
            post, "/stacks/decode/transaction", standard(), Stacks,
            "Summarize a serialized Stacks transaction envelope",
            stacks::decode_transaction
        ),
        endpoint!(
            get, "/stacks/profile/:address", standard(), Stacks,
            "On-chain profile: balances and names",
            stacks::profile
        ),
        endpoint!(
            post, "/stacks/verify/message", standard(), Stacks,
            "Verify a signed Stacks message against an address",
            stacks::verify_message
        ),
        endpoint!(
            post, "/stacks/verify/sip018", standard(), Stacks,
            "Verify a SIP-018 structured-data signature",
            stacks::verify_sip018
        ),
        // Inference
        endpoint!(
            post, "/inference/openrouter/chat", dynamic, Inference,
            "OpenAI-compatible chat completion, priced per request",
            inference::openrouter_chat, Some(chat_schema)
        ),
        endpoint!(
            post, "/inference/cloudflare/chat", standard(), Inference,
            "Workers AI chat completion at a flat price",
            inference::cloudflare_chat, Some(chat_schema)
        ),
        endpoint!(
            get, "/inference/openrouter/models", PriceSpec::Free, Inference,
            "Model catalog snapshot",
            inference::openrouter_models
        ),
        // Storage: KV
        endpoint!(
            post, "/storage/kv", standard(), Storage,
            "Store a value under a key with optional TTL",
            kv::set
        ),
        endpoint!(
            get, "/storage/kv", standard(), Storage,
            "List keys, optionally by prefix",
            kv::list
        ),
        endpoint!(
            get, "/storage/kv/:key", standard(), Storage,
            "Read one key",
            kv::get
        ),
        endpoint!(
            delete, "/storage/kv/:key", standard(), Storage,
            "Delete one key",
            kv::delete
        ),
        // Storage: paste
        endpoint!(
            post, "/storage/paste", standard(), Storage,
            "Create an immutable paste with a short id",
            paste::create
        ),
        endpoint!(
            get, "/storage/paste/:id", standard(), Storage,
            "Read one paste",
            paste::get
        ),
        endpoint!(
            delete, "/storage/paste/:id", standard(), Storage,
            "Delete one paste",
            paste::delete
        ),
        // Storage: SQL sandbox
        endpoint!(
            post, "/storage/db/query", standard(), Storage,
            "Read-only SELECT over the payer's own tables",
            db::query
        ),
        endpoint!(
            post, "/storage/db/execute", standard(), Storage,
            "Mutating statement over the payer's own tables",
            db::execute
        ),
        endpoint!(
            get, "/storage/db/schema", standard(), Storage,
            "List user tables and their DDL",
            db::schema
        ),
        // Storage: sync locks
        endpoint!(
            post, "/storage/sync/lock", standard(), Storage,
            "Acquire a named lock",
            sync_handlers::lock
        ),
        endpoint!(
            post, "/storage/sync/unlock", standard(), Storage,
            "Release a lock with its holder token",
            sync_handlers::unlock
        ),
        endpoint!(
            post, "/storage/sync/extend", standard(), Storage,
            "Extend an unexpired lock",
            sync_handlers::extend
        ),
        endpoint!(
            get, "/storage/sync/status/:name", standard(), Storage,
            "Inspect one lock",
            sync_handlers::status
        ),
        endpoint!(
            get, "/storage/sync/list", standard(), Storage,
            "List held locks",
            sync_handlers::list
        ),
        // Storage: queue
        endpoint!(
            post, "/storage/queue/push", standard(), Storage,
            "Push items onto a priority queue",
            queue::push
        ),
        endpoint!(
            post, "/storage/queue/pop", standard(), Storage,
            "Atomically remove and return the highest-priority items",
            queue::pop
        ),
        endpoint!(
            post, "/storage/queue/peek", standard(), Storage,
            "Inspect the queue head without removing",
            queue::peek
        ),
        endpoint!(
            post, "/storage/queue/status", standard(), Storage,
            "Queue depth by state",
            queue::status
        ),
        endpoint!(
            post, "/storage/queue/clear", standard(), Storage,
            "Drop queued jobs",
            queue::clear
        ),
        // Storage: vector memory
        endpoint!(
            post, "/storage/memory/store", standard(), Storage,
            "Upsert embedded memory items",
            memory::store
        ),
        endpoint!(
            post, "/storage/memory/search", standard(), Storage,
            "Cosine-similarity search over stored items",
            memory::search
        ),
        endpoint!(
            post, "/storage/memory/delete", standard(), Storage,
            "Delete memory items by id",
            memory::delete
        ),
        endpoint!(
            post, "/storage/memory/list", standard(), Storage,
            "List memory items",
            memory::list
        ),
        endpoint!(
            post, "/storage/memory/clear", standard(), Storage,
            "Remove all memory items",
            memory::clear
        ),
        // Free surface
        endpoint!(get, "/", PriceSpec::Free, Meta, "Service banner", meta::root),
        endpoint!(get, "/health", PriceSpec::Free, Meta, "Liveness and counters", meta::health),
        endpoint!(get, "/openapi.json", PriceSpec::Free, Meta, "OpenAPI stub", meta::openapi),
        endpoint!(get, "/topics", PriceSpec::Free, Meta, "Discovery topics", meta::topics_index),
        endpoint!(get, "/topics/:topic", PriceSpec::Free, Meta, "One discovery topic", meta::topic_detail),
    ];

    let mut seen = HashSet::new();
    for endpoint in &endpoints {
        let key = (endpoint.spec.method, endpoint.spec.path);
        assert!(
            seen.insert(key),
            "duplicate endpoint registration: {} {}",
            endpoint.spec.method,
            endpoint.spec.path
        );
    }
    endpoints
}
