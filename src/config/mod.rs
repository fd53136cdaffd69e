//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `GATEWAY` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use stackspay_gateway::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod error;
mod inference;
mod logsink;
mod network;
mod server;
mod settlement;
mod storage;

pub use error::{ConfigError, ValidationError};
pub use inference::InferenceConfig;
pub use logsink::LogSinkConfig;
pub use network::NetworkConfig;
pub use server::{Environment, ServerConfig};
pub use settlement::SettlementConfig;
pub use storage::StorageConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the gateway. Load using
/// [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Network identity (chain, recipient, public base URL)
    pub network: NetworkConfig,

    /// Settlement relay (facilitator) binding
    #[serde(default)]
    pub settlement: SettlementConfig,

    /// Inference providers and model catalog knobs
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Payer shard storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote structured-log sink
    #[serde(default)]
    pub logsink: LogSinkConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `GATEWAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `GATEWAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `GATEWAY__NETWORK__RECIPIENT=SP...` -> `network.recipient = SP...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required environment variables are
    /// missing or values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("GATEWAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.network.validate()?;
        self.settlement.validate()?;
        self.inference.validate()?;
        self.storage.validate()?;
        self.logsink.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("GATEWAY__NETWORK__NETWORK", "mainnet");
        env::set_var(
            "GATEWAY__NETWORK__RECIPIENT",
            "SP000000000000000000002Q6VF78",
        );
    }

    fn clear_env() {
        env::remove_var("GATEWAY__NETWORK__NETWORK");
        env::remove_var("GATEWAY__NETWORK__RECIPIENT");
        env::remove_var("GATEWAY__SERVER__PORT");
        env::remove_var("GATEWAY__SERVER__ENVIRONMENT");
        env::remove_var("GATEWAY__STORAGE__DATA_DIR");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.network.recipient, "SP000000000000000000002Q6VF78");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok());
        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.settlement.timeout_secs, 120);
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("GATEWAY__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
    }
}
