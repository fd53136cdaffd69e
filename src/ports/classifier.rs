//! Content safety classifier port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the background content classifier.
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    /// Classifies one piece of user-provided content.
    async fn classify(&self, content: &str) -> Result<ScanVerdict, ClassifierError>;
}

/// A safety verdict. `confidence` is always within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanVerdict {
    pub safe: bool,
    pub confidence: f64,
    pub reason: String,
}

impl ScanVerdict {
    /// Builds a verdict, clamping confidence into `[0, 1]`.
    pub fn new(safe: bool, confidence: f64, reason: impl Into<String>) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { safe, confidence, reason: reason.into() }
    }

    /// Verdict stored when the classifier cannot be reached or its
    /// output cannot be parsed. Scanning must never block a write.
    pub fn unavailable() -> Self {
        Self {
            safe: true,
            confidence: 0.0,
            reason: "scan_unavailable".to_string(),
        }
    }
}

/// Classifier failures.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("network error: {0}")]
    Network(String),

    #[error("verdict unparseable: {0}")]
    Parse(String),
}
