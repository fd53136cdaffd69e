//! Chat inference provider port.
//!
//! Implementations connect to OpenAI-compatible upstreams (OpenRouter,
//! Cloudflare Workers AI) and translate between the provider API and the
//! gateway's chat types. Streaming is deliberately absent: the paid path
//! does not stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::pricing::ChatRequest;

/// Port for chat completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generates a single non-streaming completion.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, InferenceError>;

    /// Provider name for response attribution and usage records.
    fn provider_name(&self) -> &'static str;
}

/// A completed chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Upstream completion id.
    pub id: String,
    /// Model that produced the response.
    pub model: String,
    /// Assistant message content.
    pub content: String,
    /// Why generation stopped, as reported upstream.
    pub finish_reason: Option<String>,
    /// Token usage, when reported.
    pub usage: Option<TokenUsage>,
}

/// Upstream token accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Inference provider errors.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// Rate limited by provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Provider is unavailable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl InferenceError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns true if retrying later could help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InferenceError::RateLimited { .. }
                | InferenceError::Unavailable(_)
                | InferenceError::Network(_)
                | InferenceError::Timeout { .. }
        )
    }

    /// HTTP status the gateway surfaces this failure as.
    pub fn status_code(&self) -> u16 {
        match self {
            InferenceError::RateLimited { .. } => 429,
            InferenceError::AuthenticationFailed => 502,
            InferenceError::Unavailable(_) => 502,
            InferenceError::Network(_) => 502,
            InferenceError::Parse(_) => 502,
            InferenceError::InvalidRequest(_) => 400,
            InferenceError::Timeout { .. } => 504,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::ChatMessage;

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, InferenceError> {
            Ok(ChatCompletion {
                id: "echo-1".into(),
                model: request.model.clone(),
                content: request
                    .messages
                    .last()
                    .map(|m| m.content.clone())
                    .unwrap_or_default(),
                finish_reason: Some("stop".into()),
                usage: Some(TokenUsage { prompt_tokens: 1, completion_tokens: 1 }),
            })
        }

        fn provider_name(&self) -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn provider_trait_is_object_safe() {
        let provider: Box<dyn ChatProvider> = Box::new(EchoProvider);
        let request = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::user("hello")],
            max_tokens: None,
            temperature: None,
            stream: false,
        };
        let completion = provider.complete(&request).await.unwrap();
        assert_eq!(completion.content, "hello");
        assert_eq!(completion.usage.unwrap().total(), 2);
    }

    #[test]
    fn retryable_classification() {
        assert!(InferenceError::RateLimited { retry_after_secs: 30 }.is_retryable());
        assert!(InferenceError::network("down").is_retryable());
        assert!(InferenceError::Timeout { timeout_secs: 60 }.is_retryable());
        assert!(!InferenceError::AuthenticationFailed.is_retryable());
        assert!(!InferenceError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn status_codes() {
        assert_eq!(InferenceError::RateLimited { retry_after_secs: 1 }.status_code(), 429);
        assert_eq!(InferenceError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(InferenceError::Timeout { timeout_secs: 1 }.status_code(), 504);
        assert_eq!(InferenceError::network("x").status_code(), 502);
    }
}
