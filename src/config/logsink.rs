//! External structured-log sink configuration.

use serde::Deserialize;

use super::error::ValidationError;

/// Remote log sink binding. When `url` is unset, events are dropped
/// locally and only `tracing` output remains.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSinkConfig {
    /// Append-only log sink endpoint.
    #[serde(default)]
    pub url: Option<String>,

    /// Bounded submission queue capacity.
    #[serde(default = "default_capacity")]
    pub queue_capacity: usize,
}

impl LogSinkConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidLogSinkCapacity);
        }
        Ok(())
    }
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self { url: None, queue_capacity: default_capacity() }
    }
}

fn default_capacity() -> usize {
    1024
}
