//! Config parsing
//!
//! JSON (primary) and TOML. Both decode to a JSON value first so that
//! required fields can be checked before types are.

use contracts::{ContractError, TargetConfig};
use serde_json::Value;

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON (the format Singer tooling writes)
    Json,
    /// TOML
    Toml,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parse TOML into an untyped document
pub fn parse_toml(content: &str) -> Result<Value, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON into an untyped document
pub fn parse_json(content: &str) -> Result<Value, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a document in `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<Value, ContractError> {
    match format {
        ConfigFormat::Json => parse_json(content),
        ConfigFormat::Toml => parse_toml(content),
    }
}

/// Decode a checked document into `TargetConfig`
pub fn decode(document: Value) -> Result<TargetConfig, ContractError> {
    serde_json::from_value(document).map_err(|e| ContractError::ConfigParse {
        message: format!("invalid config: {e}"),
        source: Some(Box::new(e)),
    })
}
