//! Config validation
//!
//! Two stages:
//! - required fields present, all missing ones reported together
//! - field rules declared on `TargetConfig`

use contracts::{ContractError, TargetConfig, REQUIRED_FIELDS};
use serde_json::Value;
use validator::Validate;

/// Fail if any required field is absent from the raw document
pub fn check_required(document: &Value) -> Result<(), ContractError> {
    let Some(fields) = document.as_object() else {
        return Err(ContractError::config_parse("config must be an object"));
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            "config",
            format!("missing required fields: {missing:?}"),
        ))
    }
}

/// Check field rules
///
/// Reports the first failing field in name order.
pub fn validate(config: &TargetConfig) -> Result<(), ContractError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };

    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    match fields.first() {
        Some((field, errs)) => {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("invalid value for {field}"));
            Err(ContractError::config_validation(field.to_string(), message))
        }
        None => Err(ContractError::config_validation("config", errors.to_string())),
    }
}
