//! OpenAI-compatible chat request shape consumed by dynamic pricing and
//! the inference endpoints.

use serde::{Deserialize, Serialize};

/// A chat completion request. Parsed once by the payment middleware for
/// dynamic endpoints and cached in the request context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Streaming is not supported under the paid path; `true` is a 400.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl ChatRequest {
    /// Total characters across all message contents, the basis for the
    /// input-token estimate.
    pub fn total_content_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_chars_across_messages() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::system("abc"), ChatMessage::user("defgh")],
            max_tokens: None,
            temperature: None,
            stream: false,
        };
        assert_eq!(req.total_content_chars(), 8);
    }

    #[test]
    fn stream_defaults_to_false() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"model":"x","messages":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();
        assert!(!req.stream);
        assert_eq!(req.max_tokens, None);
    }

    #[test]
    fn stream_flag_parses() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"model":"x","messages":[],"stream":true}"#,
        )
        .unwrap();
        assert!(req.stream);
    }
}
