//! Gateway entry point: load configuration, initialize tracing, build
//! the router, serve.

use tracing_subscriber::EnvFilter;

use stackspay_gateway::config::AppConfig;
use stackspay_gateway::http::{build_router, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    let addr = config.server.socket_addr();
    tracing::info!(
        %addr,
        network = %config.network.network.chain_id(),
        recipient = %config.network.recipient,
        "starting gateway"
    );

    let state = AppState::from_config(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
