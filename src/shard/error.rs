//! Shard error types.

use thiserror::Error;

/// Errors from payer shard operations.
#[derive(Debug, Error)]
pub enum ShardError {
    /// Caller-supplied input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The statement touches guarded tables or forbidden keywords.
    #[error("statement rejected: {0}")]
    Rejected(String),

    /// Payer address cannot name a shard.
    #[error("invalid payer address: {0}")]
    InvalidPayer(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Database(String),
}

impl ShardError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ShardError::InvalidInput(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ShardError::Rejected(message.into())
    }

    /// HTTP status this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            ShardError::InvalidInput(_) | ShardError::Rejected(_) => 400,
            ShardError::InvalidPayer(_) => 500,
            ShardError::Database(_) => 500,
        }
    }
}

impl From<sqlx::Error> for ShardError {
    fn from(e: sqlx::Error) -> Self {
        ShardError::Database(e.to_string())
    }
}
