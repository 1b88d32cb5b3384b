//! Layered error definitions
//!
//! Categorized by source: config / input / buffer / transfer

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Input Errors =====
    /// Line could not be decoded as a known message
    #[error("unrecognized message at line {line}: {message}")]
    Protocol { line: u64, message: String },

    /// Record arrived for a stream with no schema
    #[error("record for stream '{stream}' received before its schema")]
    UnknownStream { stream: String },

    // ===== Buffer Errors =====
    /// A single record can never fit in one transfer
    #[error("can't accept a record larger than {max} bytes (got {size})")]
    OversizedRecord { size: usize, max: usize },

    // ===== Transfer Errors =====
    /// Endpoint answered with a non-success status
    #[error("error sending data to the Magento BI API for table '{table}': {status} - {body}")]
    Transfer {
        table: String,
        status: u16,
        body: String,
    },

    /// Request never produced a response
    #[error("transfer to table '{table}' failed: {message}")]
    TransferConnection { table: String, message: String },

    // ===== General Errors =====
    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create protocol violation error
    pub fn protocol(line: u64, message: impl Into<String>) -> Self {
        Self::Protocol {
            line,
            message: message.into(),
        }
    }

    /// Create transfer connection error
    pub fn transfer_connection(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransferConnection {
            table: table.into(),
            message: message.into(),
        }
    }

    /// True when the error came from the downstream endpoint
    pub fn is_downstream_failure(&self) -> bool {
        matches!(
            self,
            Self::Transfer { .. } | Self::TransferConnection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downstream_classification() {
        let rejected = ContractError::Transfer {
            table: "orders".into(),
            status: 500,
            body: "boom".into(),
        };
        assert!(rejected.is_downstream_failure());
        assert!(ContractError::transfer_connection("orders", "reset").is_downstream_failure());
        assert!(!ContractError::protocol(3, "bad").is_downstream_failure());
        assert!(!ContractError::OversizedRecord { size: 9, max: 8 }.is_downstream_failure());
    }

    #[test]
    fn test_transfer_error_display_carries_status_and_body() {
        let err = ContractError::Transfer {
            table: "orders".into(),
            status: 413,
            body: "payload too large".into(),
        };
        let text = err.to_string();
        assert!(text.contains("413"), "got: {text}");
        assert!(text.contains("payload too large"), "got: {text}");
    }
}
