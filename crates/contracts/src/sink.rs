//! RecordSink trait - Session output interface
//!
//! Defines the abstract interface for record sinks.

use serde_json::Value;

use crate::{CheckpointToken, ContractError, PersistedBatch};

/// Record consumer trait
///
/// Each call yields at most one persisted batch so that the caller can
/// emit its checkpoint before the next transfer is attempted.
#[trait_variant::make(RecordSink: Send)]
pub trait LocalRecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Accept one record for `table_name`
    ///
    /// # Errors
    /// Rejected record or failed transfer; both are fatal.
    async fn push(
        &mut self,
        table_name: &str,
        record: &Value,
        checkpoint_token: CheckpointToken,
    ) -> Result<Option<PersistedBatch>, ContractError>;

    /// Persist the next pending batch regardless of thresholds
    ///
    /// Returns `None` once nothing is pending.
    async fn flush_next(&mut self) -> Result<Option<PersistedBatch>, ContractError>;
}
