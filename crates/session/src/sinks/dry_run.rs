//! DryRunSink - acknowledges records without sending them

use contracts::{CheckpointToken, ContractError, PersistedBatch, RecordSink};
use serde_json::Value;
use tracing::{instrument, warn};

/// Records per simulated batch
pub const DRY_RUN_BATCH_SIZE: usize = 100;

/// Sink that discards records and reports a batch every 100 of them
#[derive(Debug)]
pub struct DryRunSink {
    name: String,
    pending: Vec<CheckpointToken>,
}

impl DryRunSink {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        warn!(sink = %name, "---- DRY RUN: NOTHING IS BEING PERSISTED TO MAGENTO BI ----");
        Self {
            name,
            pending: Vec::with_capacity(DRY_RUN_BATCH_SIZE),
        }
    }

    /// Records accepted since the last simulated batch
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn cut(&mut self) -> PersistedBatch {
        let tokens = std::mem::take(&mut self.pending);
        PersistedBatch::new(tokens.len(), tokens)
    }
}

impl RecordSink for DryRunSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "dry_run_sink_push",
        skip(self, _record, checkpoint_token),
        fields(sink = %self.name)
    )]
    async fn push(
        &mut self,
        table_name: &str,
        _record: &Value,
        checkpoint_token: CheckpointToken,
    ) -> Result<Option<PersistedBatch>, ContractError> {
        observability::record_record_enqueued(table_name);
        self.pending.push(checkpoint_token);

        if self.pending.len() >= DRY_RUN_BATCH_SIZE {
            Ok(Some(self.cut()))
        } else {
            Ok(None)
        }
    }

    #[instrument(name = "dry_run_sink_flush_next", skip(self), fields(sink = %self.name))]
    async fn flush_next(&mut self) -> Result<Option<PersistedBatch>, ContractError> {
        if self.pending.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.cut()))
        }
    }
}
