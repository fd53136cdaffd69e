//! Shared application state injected into dispatch.
//!
//! All process-global mutable state (catalog, metrics, log sink) is
//! owned here and injected, never imported as module globals, so tests
//! can instantiate private copies.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{
    CloudflareConfig, CloudflareProvider, FacilitatorClient, FacilitatorConfig, HiroClient,
    HiroConfig, HttpLogTransport, LlmClassifier, LogSink, OpenRouterConfig, OpenRouterProvider,
};
use crate::config::AppConfig;
use crate::domain::catalog::{CatalogEntry, ModelCatalog, ModelSource, ModelSourceError};
use crate::domain::pricing::PricingEngine;
use crate::metrics::GatewayMetrics;
use crate::ports::{ChainLookup, ChatProvider, SettlementClient};
use crate::safety::SafetyScanner;
use crate::shard::ShardManager;
use secrecy::ExposeSecret;

/// Everything the dispatcher and handlers need.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pricing: Arc<PricingEngine>,
    pub catalog: Arc<ModelCatalog>,
    pub settlement: Arc<dyn SettlementClient>,
    pub openrouter: Option<Arc<dyn ChatProvider>>,
    pub cloudflare: Option<Arc<dyn ChatProvider>>,
    pub chain: Option<Arc<dyn ChainLookup>>,
    pub shards: Arc<ShardManager>,
    pub metrics: Arc<GatewayMetrics>,
    pub scanner: Arc<SafetyScanner>,
    pub logsink: Arc<LogSink>,
}

/// Catalog source used when no inference key is configured: every
/// refresh fails fast and pricing falls back to the compiled-in table.
struct NullModelSource;

#[async_trait::async_trait]
impl ModelSource for NullModelSource {
    async fn fetch_models(&self) -> Result<Vec<CatalogEntry>, ModelSourceError> {
        Err(ModelSourceError("no model source configured".into()))
    }
}

impl AppState {
    /// Wires real adapters from configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let config = Arc::new(config);

        let settlement: Arc<dyn SettlementClient> = Arc::new(FacilitatorClient::new(
            FacilitatorConfig::new(config.settlement.relay_url.clone())
                .with_timeout(Duration::from_secs(config.settlement.timeout_secs)),
        ));

        let openrouter_provider = config.inference.openrouter_key().map(|key| {
            Arc::new(OpenRouterProvider::new(OpenRouterConfig::new(
                key.expose_secret().clone(),
            )))
        });

        let catalog_source: Arc<dyn ModelSource> = match &openrouter_provider {
            Some(provider) => provider.clone(),
            None => Arc::new(NullModelSource),
        };
        let catalog = Arc::new(ModelCatalog::with_timing(
            catalog_source,
            Duration::from_secs(config.inference.catalog_ttl_secs),
            Duration::from_secs(config.inference.catalog_backoff_secs),
            Duration::from_secs(config.inference.catalog_refresh_timeout_secs),
        ));

        let openrouter: Option<Arc<dyn ChatProvider>> =
            openrouter_provider.clone().map(|p| p as Arc<dyn ChatProvider>);

        let cloudflare: Option<Arc<dyn ChatProvider>> =
            config.inference.cloudflare_credentials().map(|(account, token)| {
                Arc::new(CloudflareProvider::new(CloudflareConfig::new(
                    account,
                    token.expose_secret().clone(),
                ))) as Arc<dyn ChatProvider>
            });

        let chain: Option<Arc<dyn ChainLookup>> = Some(Arc::new(HiroClient::new({
            let mut hiro = HiroConfig::new();
            if let Some(key) = &config.inference.hiro_api_key {
                hiro = hiro.with_api_key(key.clone());
            }
            hiro
        })));

        let scanner = match &openrouter {
            Some(provider) => SafetyScanner::new(Some(Arc::new(LlmClassifier::new(
                provider.clone(),
            )))),
            None => SafetyScanner::disabled(),
        };

        let logsink = LogSink::start(
            config
                .logsink
                .url
                .as_ref()
                .map(|url| Arc::new(HttpLogTransport::new(url.clone())) as _),
            config.logsink.queue_capacity,
        );

        Self {
            shards: ShardManager::new(&config.storage.data_dir),
            pricing: Arc::new(PricingEngine::new()),
            catalog,
            settlement,
            openrouter,
            cloudflare,
            chain,
            metrics: Arc::new(GatewayMetrics::new()),
            scanner,
            logsink,
            config,
        }
    }
}
