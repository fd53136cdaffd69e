//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Recipient address does not match configured network")]
    RecipientNetworkMismatch,

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Invalid settlement relay URL")]
    InvalidSettlementUrl,

    #[error("Settlement timeout out of range (1..=600 seconds)")]
    InvalidSettlementTimeout,

    #[error("Invalid public base URL")]
    InvalidBaseUrl,

    #[error("Catalog TTL must be positive")]
    InvalidCatalogTtl,

    #[error("Storage data directory is empty")]
    EmptyDataDir,

    #[error("Log sink queue capacity must be positive")]
    InvalidLogSinkCapacity,
}
