//! Settlement relay (facilitator) configuration.

use serde::Deserialize;

use super::error::ValidationError;

/// Settlement relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    /// Facilitator base URL.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Timeout for one settle call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SettlementConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.relay_url.starts_with("http://") && !self.relay_url.starts_with("https://") {
            return Err(ValidationError::InvalidSettlementUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err(ValidationError::InvalidSettlementTimeout);
        }
        Ok(())
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_relay_url() -> String {
    "https://facilitator.stackspay.org".to_string()
}

fn default_timeout() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SettlementConfig::default().validate().is_ok());
        assert_eq!(SettlementConfig::default().timeout_secs, 120);
    }

    #[test]
    fn rejects_non_http_url() {
        let config = SettlementConfig {
            relay_url: "ftp://relay".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = SettlementConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
