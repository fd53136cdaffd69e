//! HTTP layer: router construction, middleware, handlers, discovery.
//!
//! The dispatcher iterates the endpoint registry once at startup. Every
//! registered route gets the payment state machine attached with its
//! declared tier; free tiers pass straight through it. Correlation ids
//! are bound outermost, panic recovery just inside.

pub mod discovery;
pub mod handlers;
pub mod helpers;
pub mod middleware;
pub mod registry;
pub mod state;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;

use self::middleware::{
    correlation_middleware, payment_middleware, recovery_middleware, PaymentPolicy,
};
use self::registry::endpoint_registry;
use self::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let mut router: Router<AppState> = Router::new();

    for endpoint in endpoint_registry() {
        let policy = PaymentPolicy { spec: endpoint.spec.clone(), state: state.clone() };
        let handler = endpoint
            .handler
            .route_layer(from_fn_with_state(policy, payment_middleware));
        router = router.route(endpoint.spec.path, handler);
    }

    // Discovery documents sit outside the priced registry.
    router = router
        .route("/x402.json", get(discovery::x402_manifest))
        .route("/.well-known/agent.json", get(discovery::agent_json))
        .route("/llms.txt", get(discovery::llms_txt))
        .route("/llms-full.txt", get(discovery::llms_full_txt));

    router
        .layer(from_fn(recovery_middleware))
        .layer(from_fn(correlation_middleware))
        .with_state(state)
}
