//! Fire-and-forget content-safety side channel.
//!
//! Handlers that store user content schedule a scan and return
//! immediately. The spawned task classifies the content and upserts the
//! verdict into the payer's shard; any classifier failure degrades to
//! the `scan_unavailable` verdict. A scan never delays or fails a
//! handler response.

use std::sync::Arc;

use crate::ports::{ContentClassifier, ScanVerdict};
use crate::shard::{ScanContentType, Shard};

/// Schedules background scans of stored content.
pub struct SafetyScanner {
    classifier: Option<Arc<dyn ContentClassifier>>,
}

impl SafetyScanner {
    pub fn new(classifier: Option<Arc<dyn ContentClassifier>>) -> Arc<Self> {
        Arc::new(Self { classifier })
    }

    /// Disabled scanner for deployments without a classifier; verdicts
    /// are recorded as unavailable.
    pub fn disabled() -> Arc<Self> {
        Self::new(None)
    }

    /// Queues one scan. Returns immediately.
    pub fn schedule(
        &self,
        shard: Shard,
        content_id: String,
        content_type: ScanContentType,
        content: String,
    ) {
        let classifier = self.classifier.clone();
        tokio::spawn(async move {
            let verdict = match classifier {
                Some(classifier) => match classifier.classify(&content).await {
                    Ok(verdict) => verdict,
                    Err(err) => {
                        tracing::debug!(error = %err, content_id, "content scan failed");
                        ScanVerdict::unavailable()
                    }
                },
                None => ScanVerdict::unavailable(),
            };

            if let Err(err) = shard.scan_store(&content_id, content_type, &verdict).await {
                tracing::debug!(error = %err, content_id, "scan verdict store failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ClassifierError;
    use crate::shard::ShardManager;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedClassifier(ScanVerdict);

    #[async_trait]
    impl ContentClassifier for FixedClassifier {
        async fn classify(&self, _content: &str) -> Result<ScanVerdict, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl ContentClassifier for FailingClassifier {
        async fn classify(&self, _content: &str) -> Result<ScanVerdict, ClassifierError> {
            Err(ClassifierError::Network("down".into()))
        }
    }

    async fn wait_for_verdict(shard: &Shard, id: &str) -> crate::shard::ScanRecord {
        for _ in 0..50 {
            if let Some(record) = shard.scan_get(id).await.unwrap() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("scan verdict never arrived");
    }

    #[tokio::test]
    async fn scheduled_scan_stores_verdict() {
        let shard = ShardManager::in_memory()
            .shard_for("SP000000000000000000002Q6VF78")
            .await
            .unwrap();
        let scanner = SafetyScanner::new(Some(Arc::new(FixedClassifier(ScanVerdict::new(
            false, 0.9, "flagged",
        )))));

        scanner.schedule(
            shard.clone(),
            "paste-1".into(),
            ScanContentType::Paste,
            "content".into(),
        );

        let record = wait_for_verdict(&shard, "paste-1").await;
        assert!(!record.safe);
        assert_eq!(record.reason.as_deref(), Some("flagged"));
    }

    #[tokio::test]
    async fn classifier_failure_stores_unavailable_verdict() {
        let shard = ShardManager::in_memory()
            .shard_for("SP000000000000000000002Q6VF78")
            .await
            .unwrap();
        let scanner = SafetyScanner::new(Some(Arc::new(FailingClassifier)));

        scanner.schedule(shard.clone(), "kv-1".into(), ScanContentType::Kv, "x".into());

        let record = wait_for_verdict(&shard, "kv-1").await;
        assert!(record.safe);
        assert_eq!(record.confidence, 0.0);
        assert_eq!(record.reason.as_deref(), Some("scan_unavailable"));
    }

    #[tokio::test]
    async fn disabled_scanner_records_unavailable() {
        let shard = ShardManager::in_memory()
            .shard_for("SP000000000000000000002Q6VF78")
            .await
            .unwrap();
        let scanner = SafetyScanner::disabled();

        scanner.schedule(shard.clone(), "m-1".into(), ScanContentType::Memory, "x".into());

        let record = wait_for_verdict(&shard, "m-1").await;
        assert_eq!(record.reason.as_deref(), Some("scan_unavailable"));
    }
}
