//! Payer shard storage configuration.

use serde::Deserialize;

use super::error::ValidationError;

/// Storage configuration for payer shards.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one SQLite database per payer, or `:memory:`
    /// for ephemeral shards.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.data_dir.is_empty() {
            return Err(ValidationError::EmptyDataDir);
        }
        Ok(())
    }

    /// True when shards live only in memory.
    pub fn is_ephemeral(&self) -> bool {
        self.data_dir == ":memory:"
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

fn default_data_dir() -> String {
    "./data/shards".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StorageConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_ephemeral());
    }

    #[test]
    fn memory_mode_detected() {
        let config = StorageConfig { data_dir: ":memory:".into() };
        assert!(config.is_ephemeral());
    }

    #[test]
    fn empty_dir_rejected() {
        let config = StorageConfig { data_dir: String::new() };
        assert!(config.validate().is_err());
    }
}
