//! TargetConfig - Config Loader output

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::MAX_BATCH_SIZE_BYTES;

/// Default Magento BI import endpoint
pub const DEFAULT_MAGENTOBI_URL: &str = "https://connect.rjmetrics.com/v2/";

/// Fields that must be present in every config file
pub const REQUIRED_FIELDS: &[&str] = &["client_id", "api_key"];

/// Connector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TargetConfig {
    /// Magento BI client (account) id
    pub client_id: u64,

    /// API key sent with every request
    #[validate(length(min = 1, message = "api_key cannot be empty"))]
    pub api_key: String,

    /// Base URL of the import API
    #[serde(default = "default_magentobi_url")]
    #[validate(url(message = "magentobi_url must be a valid URL"))]
    pub magentobi_url: String,

    /// Flush once this many bytes are buffered
    #[serde(default = "default_batch_size_bytes")]
    #[validate(range(min = 1, message = "batch_size_bytes must be >= 1"))]
    pub batch_size_bytes: usize,

    /// Flush once the oldest buffered record is this old
    #[serde(default = "default_batch_delay_millis")]
    pub batch_delay_millis: u64,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, message = "request_timeout_secs must be >= 1"))]
    pub request_timeout_secs: u64,

    /// Skip the anonymous usage beacon
    #[serde(default)]
    pub disable_collection: bool,
}

impl TargetConfig {
    /// Config with defaults for everything but the credentials
    pub fn new(client_id: u64, api_key: impl Into<String>) -> Self {
        Self {
            client_id,
            api_key: api_key.into(),
            magentobi_url: default_magentobi_url(),
            batch_size_bytes: default_batch_size_bytes(),
            batch_delay_millis: default_batch_delay_millis(),
            request_timeout_secs: default_request_timeout_secs(),
            disable_collection: false,
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_magentobi_url() -> String {
    DEFAULT_MAGENTOBI_URL.to_string()
}

fn default_batch_size_bytes() -> usize {
    MAX_BATCH_SIZE_BYTES
}

fn default_batch_delay_millis() -> u64 {
    60_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: TargetConfig =
            serde_json::from_str(r#"{"client_id": 12, "api_key": "secret"}"#).unwrap();
        assert_eq!(config, TargetConfig::new(12, "secret"));
        assert_eq!(config.batch_delay(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_string_client_id_is_rejected() {
        let result =
            serde_json::from_str::<TargetConfig>(r#"{"client_id": "12", "api_key": "secret"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rules() {
        let mut config = TargetConfig::new(1, "");
        assert!(config.validate().is_err());

        config.api_key = "key".into();
        config.magentobi_url = "not a url".into();
        assert!(config.validate().is_err());

        config.magentobi_url = DEFAULT_MAGENTOBI_URL.into();
        config.batch_size_bytes = 0;
        assert!(config.validate().is_err());
    }
}
