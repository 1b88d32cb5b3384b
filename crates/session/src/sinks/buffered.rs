//! BufferedSink - buffers records and dispatches ready batches

use std::time::Duration;

use buffer::RecordBuffer;
use contracts::{
    Batch, CheckpointToken, ContractError, PersistedBatch, RecordPayload, RecordSink,
    TargetConfig, Transport,
};
use dispatcher::Dispatcher;
use serde_json::Value;
use tracing::{debug, instrument};

/// Readiness thresholds and routing for one sink
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    /// Routing (account) id stamped on every record
    pub client_id: u64,
    /// Byte threshold that makes the buffer ready
    pub target_bytes: usize,
    /// Age of the oldest record that makes the buffer ready
    pub max_age: Duration,
}

impl BatchSettings {
    pub fn from_target_config(config: &TargetConfig) -> Self {
        Self {
            client_id: config.client_id,
            target_bytes: config.batch_size_bytes,
            max_age: config.batch_delay(),
        }
    }
}

/// Sink that owns the buffer and the dispatcher
///
/// At most one batch is in flight: `push` blocks on the transfer of the
/// batch its enqueue made ready.
pub struct BufferedSink<T> {
    name: String,
    settings: BatchSettings,
    buffer: RecordBuffer,
    dispatcher: Dispatcher<T>,
}

impl<T: Transport + Send + Sync> BufferedSink<T> {
    pub fn new(name: impl Into<String>, settings: BatchSettings, transport: T) -> Self {
        Self {
            name: name.into(),
            settings,
            buffer: RecordBuffer::new(),
            dispatcher: Dispatcher::new(transport),
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub fn buffer(&self) -> &RecordBuffer {
        &self.buffer
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    async fn persist(&self, batch: Batch) -> Result<PersistedBatch, ContractError> {
        let report = self.dispatcher.send(&batch).await?;
        debug!(
            sink = %self.name,
            records = report.record_count(),
            bytes = report.bytes(),
            tables = report.groups.len(),
            "Batch persisted"
        );
        Ok(PersistedBatch::new(
            report.record_count(),
            batch.checkpoint_tokens(),
        ))
    }
}

impl<T: Transport + Send + Sync> RecordSink for BufferedSink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "buffered_sink_push",
        skip(self, record, checkpoint_token),
        fields(sink = %self.name)
    )]
    async fn push(
        &mut self,
        table_name: &str,
        record: &Value,
        checkpoint_token: CheckpointToken,
    ) -> Result<Option<PersistedBatch>, ContractError> {
        let payload = RecordPayload::new(self.settings.client_id, table_name, record)?;
        self.buffer.enqueue(payload, checkpoint_token)?;
        observability::record_record_enqueued(table_name);

        let ready = self
            .buffer
            .take_ready_batch(self.settings.target_bytes, self.settings.max_age);
        observability::record_buffer_state(self.buffer.len(), self.buffer.available_bytes());

        match ready {
            Some(batch) => self.persist(batch).await.map(Some),
            None => Ok(None),
        }
    }

    #[instrument(name = "buffered_sink_flush_next", skip(self), fields(sink = %self.name))]
    async fn flush_next(&mut self) -> Result<Option<PersistedBatch>, ContractError> {
        let Some(batch) = self.buffer.drain().next() else {
            return Ok(None);
        };
        observability::record_buffer_state(self.buffer.len(), self.buffer.available_bytes());

        self.persist(batch).await.map(Some)
    }
}
