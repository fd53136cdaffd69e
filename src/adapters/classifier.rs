//! LLM-backed content safety classifier.
//!
//! Classifies user-provided content with a fixed system prompt at low
//! temperature and parses a strict JSON verdict. Used only through the
//! fire-and-forget scan side channel; failures degrade to the
//! `scan_unavailable` verdict and never surface to handlers.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::pricing::{ChatMessage, ChatRequest};
use crate::ports::{ChatProvider, ClassifierError, ContentClassifier, ScanVerdict};

/// System prompt fixed for every scan.
const SCAN_SYSTEM_PROMPT: &str = "You are a content safety classifier. Respond with only a JSON \
object: {\"safe\": boolean, \"confidence\": number between 0 and 1, \"reason\": short string}. \
Unsafe content includes malware, credential dumps, and illegal material.";

/// Model used for scans.
const SCAN_MODEL: &str = "openai/gpt-4o-mini";

/// Classifier built on a chat provider.
pub struct LlmClassifier {
    provider: Arc<dyn ChatProvider>,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ContentClassifier for LlmClassifier {
    async fn classify(&self, content: &str) -> Result<ScanVerdict, ClassifierError> {
        let request = ChatRequest {
            model: SCAN_MODEL.to_string(),
            messages: vec![
                ChatMessage::system(SCAN_SYSTEM_PROMPT),
                ChatMessage::user(content),
            ],
            max_tokens: Some(200),
            temperature: Some(0.1),
            stream: false,
        };

        let completion = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        parse_verdict(&completion.content)
    }
}

/// Parses the strict JSON verdict, tolerating surrounding prose.
fn parse_verdict(raw: &str) -> Result<ScanVerdict, ClassifierError> {
    let json_slice = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => return Err(ClassifierError::Parse("no JSON object in verdict".into())),
    };

    #[derive(serde::Deserialize)]
    struct RawVerdict {
        safe: bool,
        confidence: f64,
        #[serde(default)]
        reason: String,
    }

    let parsed: RawVerdict = serde_json::from_str(json_slice)
        .map_err(|e| ClassifierError::Parse(e.to_string()))?;
    Ok(ScanVerdict::new(parsed.safe, parsed.confidence, parsed.reason))
}
