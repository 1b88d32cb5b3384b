//! Singer input messages
//!
//! One JSON object per line, tagged by `"type"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CheckpointToken, ContractError};

/// A decoded input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Declares the shape and key of a stream
    Schema(SchemaMessage),
    /// One row for a stream
    Record(RecordMessage),
    /// Producer checkpoint
    State(StateMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMessage {
    pub stream: String,
    pub schema: Value,
    pub key_properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    pub stream: String,
    pub record: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub value: Value,
}

impl StateMessage {
    /// The checkpoint carried by this message (`null` counts as absent)
    pub fn into_token(self) -> CheckpointToken {
        match self.value {
            Value::Null => None,
            value => Some(value),
        }
    }
}

/// Decode one input line
///
/// `line_no` is 1-based and only used for error context.
pub fn parse_message(line: &str, line_no: u64) -> Result<Message, ContractError> {
    serde_json::from_str(line).map_err(|e| ContractError::protocol(line_no, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_schema() {
        let line = r#"{"type":"SCHEMA","stream":"orders","schema":{"type":"object"},"key_properties":["id"]}"#;
        let message = parse_message(line, 1).unwrap();
        assert_eq!(
            message,
            Message::Schema(SchemaMessage {
                stream: "orders".into(),
                schema: json!({"type": "object"}),
                key_properties: vec!["id".into()],
            })
        );
    }

    #[test]
    fn test_parse_record_ignores_extra_fields() {
        let line = r#"{"type":"RECORD","stream":"orders","record":{"id":1},"version":3,"time_extracted":"2017-01-01T00:00:00Z"}"#;
        match parse_message(line, 1).unwrap() {
            Message::Record(record) => {
                assert_eq!(record.stream, "orders");
                assert_eq!(record.record, json!({"id": 1}));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_null_state_is_absent() {
        let state = StateMessage { value: Value::Null };
        assert_eq!(state.into_token(), None);

        let state = StateMessage {
            value: json!({"bookmark": 5}),
        };
        assert_eq!(state.into_token(), Some(json!({"bookmark": 5})));
    }

    #[test]
    fn test_unknown_type_is_protocol_error() {
        let line = r#"{"type":"ACTIVATE_VERSION","stream":"orders","version":1}"#;
        let err = parse_message(line, 12).unwrap_err();
        assert!(matches!(err, ContractError::Protocol { line: 12, .. }), "got: {err}");
    }

    #[test]
    fn test_garbage_is_protocol_error() {
        let err = parse_message("not json", 2).unwrap_err();
        assert!(matches!(err, ContractError::Protocol { line: 2, .. }));
    }

    #[test]
    fn test_missing_field_is_protocol_error() {
        let err = parse_message(r#"{"type":"RECORD","record":{}}"#, 4).unwrap_err();
        assert!(err.to_string().contains("stream"), "got: {err}");
    }
}
