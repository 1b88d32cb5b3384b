//! Buffered record types - Buffer input and Dispatcher input
//!
//! Records are serialized once, when they are handed to the buffer. Every
//! later size check and the final request body reuse those bytes, so the
//! byte accounting always matches what goes over the wire.

use std::time::Instant;

use bytes::Bytes;
use serde_json::Value;

use crate::ContractError;

/// Hard ceiling on one transfer body, imposed by the Magento BI API
pub const MAX_BATCH_SIZE_BYTES: usize = 4_194_304;

/// Hard cap on records per transfer, imposed by the Magento BI API
pub const MAX_MESSAGES_PER_BATCH: usize = 100;

/// Bytes taken by the enclosing `[` and `]`
pub const ARRAY_WRAPPER_BYTES: usize = 2;

/// Bytes taken by the `,` between two records
pub const SEPARATOR_BYTES: usize = 1;

/// Largest single record the buffer accepts
pub const MAX_RECORD_BYTES: usize = MAX_BATCH_SIZE_BYTES - ARRAY_WRAPPER_BYTES;

/// Opaque producer checkpoint, absent when no state preceded the record
pub type CheckpointToken = Option<Value>;

/// One serialized record and its routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPayload {
    client_id: u64,
    table_name: String,
    record: Bytes,
}

impl RecordPayload {
    /// Serialize a record for the given client and table
    pub fn new(
        client_id: u64,
        table_name: impl Into<String>,
        record: &Value,
    ) -> Result<Self, ContractError> {
        let record = serde_json::to_vec(record)?;
        Ok(Self::from_serialized(client_id, table_name, Bytes::from(record)))
    }

    /// Wrap bytes that are already a serialized JSON value
    pub fn from_serialized(client_id: u64, table_name: impl Into<String>, record: Bytes) -> Self {
        Self {
            client_id,
            table_name: table_name.into(),
            record,
        }
    }

    /// Routing (account) identifier
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Destination table
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Serialized record
    pub fn record(&self) -> &Bytes {
        &self.record
    }

    /// Size of the serialized record in bytes
    pub fn serialized_len(&self) -> usize {
        self.record.len()
    }
}

/// One pending unit of work held by the buffer
#[derive(Debug, Clone)]
pub struct BufferEntry {
    enqueue_time: Instant,
    payload: RecordPayload,
    checkpoint_token: CheckpointToken,
}

impl BufferEntry {
    pub fn new(payload: RecordPayload, checkpoint_token: CheckpointToken, enqueue_time: Instant) -> Self {
        Self {
            enqueue_time,
            payload,
            checkpoint_token,
        }
    }

    pub fn enqueue_time(&self) -> Instant {
        self.enqueue_time
    }

    pub fn payload(&self) -> &RecordPayload {
        &self.payload
    }

    pub fn checkpoint_token(&self) -> &CheckpointToken {
        &self.checkpoint_token
    }

    pub fn serialized_len(&self) -> usize {
        self.payload.serialized_len()
    }
}

/// Ordered, non-empty run of entries for one transfer attempt
#[derive(Debug, Clone)]
pub struct Batch {
    entries: Vec<BufferEntry>,
}

impl Batch {
    /// Build a batch, `None` when `entries` is empty
    pub fn from_entries(entries: Vec<BufferEntry>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self { entries })
        }
    }

    pub fn entries(&self) -> &[BufferEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the batch as one JSON array: records, separators and wrapper
    pub fn serialized_size(&self) -> usize {
        let records: usize = self.entries.iter().map(BufferEntry::serialized_len).sum();
        ARRAY_WRAPPER_BYTES + records + SEPARATOR_BYTES * (self.entries.len() - 1)
    }

    /// Checkpoint tokens in FIFO order
    pub fn checkpoint_tokens(&self) -> Vec<CheckpointToken> {
        self.entries
            .iter()
            .map(|entry| entry.checkpoint_token.clone())
            .collect()
    }
}

/// Acknowledgement that a batch reached the endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedBatch {
    /// Number of records persisted
    pub record_count: usize,
    /// Checkpoint tokens of those records, in FIFO order
    pub tokens: Vec<CheckpointToken>,
}

impl PersistedBatch {
    pub fn new(record_count: usize, tokens: Vec<CheckpointToken>) -> Self {
        Self {
            record_count,
            tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(table: &str, record: &str, token: CheckpointToken) -> BufferEntry {
        let payload = RecordPayload::from_serialized(7, table, Bytes::from(record.to_string()));
        BufferEntry::new(payload, token, Instant::now())
    }

    #[test]
    fn test_payload_serializes_record_once() {
        let payload = RecordPayload::new(42, "orders", &json!({"id": 1})).unwrap();
        assert_eq!(payload.client_id(), 42);
        assert_eq!(payload.table_name(), "orders");
        assert_eq!(payload.record().as_ref(), br#"{"id":1}"#);
        assert_eq!(payload.serialized_len(), 8);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(Batch::from_entries(Vec::new()).is_none());
    }

    #[test]
    fn test_batch_size_counts_wrapper_and_separators() {
        let batch = Batch::from_entries(vec![
            entry("a", "1", None),
            entry("a", "22", None),
            entry("b", "333", None),
        ])
        .unwrap();
        // [1,22,333]
        assert_eq!(batch.serialized_size(), 10);
    }

    #[test]
    fn test_batch_tokens_keep_fifo_order() {
        let batch = Batch::from_entries(vec![
            entry("a", "1", Some(json!(1))),
            entry("a", "2", None),
            entry("a", "3", Some(json!(3))),
        ])
        .unwrap();
        let persisted = PersistedBatch::new(batch.len(), batch.checkpoint_tokens());
        assert_eq!(persisted.record_count, 3);
        assert_eq!(persisted.tokens, vec![Some(json!(1)), None, Some(json!(3))]);
    }
}
