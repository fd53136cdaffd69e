//! Opportunistic model-catalog cache.
//!
//! Holds a TTL-bounded snapshot of the upstream model list and per-token
//! prices. Refresh is single-flight with a hard timeout and a failure
//! backoff; a failed refresh never disturbs the last good snapshot. The
//! cache is intentionally permissive: model validation is advisory, and
//! an empty cache means "caller must fall back", never "reject".

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// USD prices per 1k tokens for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub prompt_per_k: f64,
    pub completion_per_k: f64,
}

/// One model row as fetched from upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub prompt_per_k: f64,
    pub completion_per_k: f64,
}

/// Upstream source of the model list. Implemented by the inference
/// adapter; mocked in tests.
#[async_trait]
pub trait ModelSource: Send + Sync {
    async fn fetch_models(&self) -> Result<Vec<CatalogEntry>, ModelSourceError>;
}

/// Transport or decode failure fetching the model list.
#[derive(Debug, Clone, thiserror::Error)]
#[error("model source error: {0}")]
pub struct ModelSourceError(pub String);

/// Result of a catalog lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogLookup {
    /// Model accepted. `pricing: None` means the cache has no snapshot
    /// and the caller must fall back to compiled-in prices.
    Valid { pricing: Option<ModelPricing> },
    /// The cache is populated and does not list this model.
    Invalid { reason: String },
}

struct CatalogState {
    models: Arc<HashMap<String, ModelPricing>>,
    last_success: Option<Instant>,
    last_failure: Option<Instant>,
}

/// Process-global model price cache.
pub struct ModelCatalog {
    source: Arc<dyn ModelSource>,
    ttl: Duration,
    backoff: Duration,
    refresh_timeout: Duration,
    state: RwLock<CatalogState>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl ModelCatalog {
    /// Default snapshot TTL.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
    /// Default backoff after a failed refresh.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(30);
    /// Hard timeout for one refresh attempt.
    pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        Self::with_timing(
            source,
            Self::DEFAULT_TTL,
            Self::DEFAULT_BACKOFF,
            Self::DEFAULT_REFRESH_TIMEOUT,
        )
    }

    pub fn with_timing(
        source: Arc<dyn ModelSource>,
        ttl: Duration,
        backoff: Duration,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            source,
            ttl,
            backoff,
            refresh_timeout,
            state: RwLock::new(CatalogState {
                models: Arc::new(HashMap::new()),
                last_success: None,
                last_failure: None,
            }),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Looks up a model, refreshing the snapshot first if it is stale and
    /// not in failure backoff.
    pub async fn lookup(&self, model: &str) -> CatalogLookup {
        self.ensure_fresh().await;

        let state = self.state.read();
        if state.last_success.is_none() {
            return CatalogLookup::Valid { pricing: None };
        }
        match state.models.get(model) {
            Some(pricing) => CatalogLookup::Valid { pricing: Some(*pricing) },
            None => CatalogLookup::Invalid {
                reason: format!("model not in catalog: {model}"),
            },
        }
    }

    /// Refreshes if stale, then returns the snapshot's model ids. Used
    /// by the free model-list endpoint.
    pub async fn models(&self) -> Vec<String> {
        self.ensure_fresh().await;
        self.snapshot_ids()
    }

    /// Current snapshot of model ids, for the free model-list endpoint.
    pub fn snapshot_ids(&self) -> Vec<String> {
        let state = self.state.read();
        let mut ids: Vec<String> = state.models.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn needs_refresh(&self) -> bool {
        let state = self.state.read();
        let stale = match state.last_success {
            None => true,
            Some(at) => at.elapsed() > self.ttl,
        };
        let backing_off = match state.last_failure {
            None => false,
            Some(at) => at.elapsed() < self.backoff,
        };
        stale && !backing_off
    }

    async fn ensure_fresh(&self) {
        if !self.needs_refresh() {
            return;
        }

        // Single-flight: concurrent callers queue here; whoever enters
        // second finds a fresh snapshot and skips the fetch.
        let _guard = self.refresh_lock.lock().await;
        if !self.needs_refresh() {
            return;
        }

        match tokio::time::timeout(self.refresh_timeout, self.source.fetch_models()).await {
            Ok(Ok(entries)) => {
                let mut models = HashMap::with_capacity(entries.len());
                for entry in entries {
                    // Garbage pricing rows are dropped at load time.
                    if !entry.prompt_per_k.is_finite()
                        || !entry.completion_per_k.is_finite()
                        || entry.prompt_per_k < 0.0
                        || entry.completion_per_k < 0.0
                    {
                        continue;
                    }
                    models.insert(
                        entry.id,
                        ModelPricing {
                            prompt_per_k: entry.prompt_per_k,
                            completion_per_k: entry.completion_per_k,
                        },
                    );
                }
                let mut state = self.state.write();
                state.models = Arc::new(models);
                state.last_success = Some(Instant::now());
                state.last_failure = None;
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "model catalog refresh failed");
                self.state.write().last_failure = Some(Instant::now());
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.refresh_timeout.as_secs(),
                    "model catalog refresh timed out"
                );
                self.state.write().last_failure = Some(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        fetches: AtomicU32,
        fail: bool,
        delay: Duration,
    }

    impl CountingSource {
        fn ok() -> Self {
            Self { fetches: AtomicU32::new(0), fail: false, delay: Duration::ZERO }
        }

        fn failing() -> Self {
            Self { fetches: AtomicU32::new(0), fail: true, delay: Duration::ZERO }
        }

        fn count(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelSource for CountingSource {
        async fn fetch_models(&self) -> Result<Vec<CatalogEntry>, ModelSourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ModelSourceError("upstream down".into()));
            }
            Ok(vec![
                CatalogEntry { id: "good/model".into(), prompt_per_k: 0.001, completion_per_k: 0.002 },
                CatalogEntry { id: "bad/nan".into(), prompt_per_k: f64::NAN, completion_per_k: 0.1 },
                CatalogEntry { id: "bad/negative".into(), prompt_per_k: -0.1, completion_per_k: 0.1 },
            ])
        }
    }

    #[tokio::test]
    async fn populated_cache_resolves_known_models() {
        let source = Arc::new(CountingSource::ok());
        let catalog = ModelCatalog::new(source.clone());

        let result = catalog.lookup("good/model").await;
        assert_eq!(
            result,
            CatalogLookup::Valid {
                pricing: Some(ModelPricing { prompt_per_k: 0.001, completion_per_k: 0.002 })
            }
        );
        assert_eq!(source.count(), 1);
    }

    #[tokio::test]
    async fn garbage_pricing_rows_are_dropped() {
        let catalog = ModelCatalog::new(Arc::new(CountingSource::ok()));
        assert!(matches!(
            catalog.lookup("bad/nan").await,
            CatalogLookup::Invalid { .. }
        ));
        assert!(matches!(
            catalog.lookup("bad/negative").await,
            CatalogLookup::Invalid { .. }
        ));
    }

    #[tokio::test]
    async fn unknown_model_in_populated_cache_is_invalid() {
        let catalog = ModelCatalog::new(Arc::new(CountingSource::ok()));
        assert!(matches!(
            catalog.lookup("vendor/unknown").await,
            CatalogLookup::Invalid { .. }
        ));
    }

    #[tokio::test]
    async fn failed_refresh_means_fall_back() {
        let catalog = ModelCatalog::new(Arc::new(CountingSource::failing()));
        assert_eq!(
            catalog.lookup("any/model").await,
            CatalogLookup::Valid { pricing: None }
        );
    }

    #[tokio::test]
    async fn fresh_snapshot_skips_refetch() {
        let source = Arc::new(CountingSource::ok());
        let catalog = ModelCatalog::new(source.clone());

        catalog.lookup("good/model").await;
        catalog.lookup("good/model").await;
        catalog.lookup("other").await;
        assert_eq!(source.count(), 1);
    }

    #[tokio::test]
    async fn failure_backoff_suppresses_refetch() {
        let source = Arc::new(CountingSource::failing());
        let catalog = ModelCatalog::with_timing(
            source.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(30),
            Duration::from_secs(3),
        );

        catalog.lookup("a").await;
        catalog.lookup("b").await;
        catalog.lookup("c").await;
        // First lookup fetched and failed; the rest are inside backoff.
        assert_eq!(source.count(), 1);
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_refresh() {
        let source = Arc::new(CountingSource {
            fetches: AtomicU32::new(0),
            fail: false,
            delay: Duration::from_millis(50),
        });
        let catalog = Arc::new(ModelCatalog::new(source.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let c = catalog.clone();
            handles.push(tokio::spawn(async move { c.lookup("good/model").await }));
        }
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(matches!(result, CatalogLookup::Valid { pricing: Some(_) }));
        }
        assert_eq!(source.count(), 1, "refresh must be single-flight");
    }

    #[tokio::test]
    async fn refresh_timeout_records_failure() {
        let source = Arc::new(CountingSource {
            fetches: AtomicU32::new(0),
            fail: false,
            delay: Duration::from_millis(200),
        });
        let catalog = ModelCatalog::with_timing(
            source.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(30),
            Duration::from_millis(20),
        );

        assert_eq!(
            catalog.lookup("good/model").await,
            CatalogLookup::Valid { pricing: None }
        );
    }

    #[tokio::test]
    async fn snapshot_ids_are_sorted() {
        let catalog = ModelCatalog::new(Arc::new(CountingSource::ok()));
        catalog.lookup("good/model").await;
        assert_eq!(catalog.snapshot_ids(), vec!["good/model".to_string()]);
    }
}
