//! Session - reads Singer messages and drives a sink

use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::time::Instant;

use contracts::{
    parse_message, CheckpointToken, ContractError, Message, PersistedBatch, RecordMessage,
    RecordSink,
};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, instrument};

use crate::checkpoint::CheckpointEmitter;
use crate::stats::SessionStats;

/// Field added to every record with its stream's key properties
pub const KEYS_FIELD: &str = "keys";

/// Composition root: input lines in, checkpoint lines out
///
/// Input is consumed strictly in order. Whatever ends the input (end of
/// stream, stop request, or an error), the sink is drained exactly once and
/// the trailing state is emitted afterwards.
pub struct Session<S, W> {
    sink: S,
    emitter: CheckpointEmitter<W>,
    key_properties: HashMap<String, Vec<String>>,
    pending_state: CheckpointToken,
    stats: SessionStats,
    finished: bool,
}

impl<S: RecordSink, W: Write> Session<S, W> {
    pub fn new(sink: S, output: W) -> Self {
        Self {
            sink,
            emitter: CheckpointEmitter::new(output),
            key_properties: HashMap::new(),
            pending_state: None,
            stats: SessionStats::default(),
            finished: false,
        }
    }

    /// Run until the input ends
    pub async fn run<R>(&mut self, reader: R) -> Result<SessionStats, ContractError>
    where
        R: AsyncBufRead + Unpin,
    {
        self.run_until(reader, std::future::pending::<()>()).await
    }

    /// Run until the input ends or `shutdown` resolves
    ///
    /// `shutdown` is only observed between lines, never while a transfer is
    /// in flight.
    #[instrument(name = "session_run", skip_all, fields(sink = %self.sink.name()))]
    pub async fn run_until<R, F>(
        &mut self,
        reader: R,
        shutdown: F,
    ) -> Result<SessionStats, ContractError>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        if self.finished {
            return Err(ContractError::Other("session already finished".into()));
        }

        let started = Instant::now();
        let consumed = self.consume(reader, shutdown).await;
        if let Err(e) = &consumed {
            error!(error = %e, "Input processing stopped");
            if e.is_downstream_failure() {
                self.emitter.fence();
            }
        }

        let drained = self.shutdown().await;
        self.finished = true;
        self.stats.duration = started.elapsed();

        match (consumed, drained) {
            (Ok(()), Ok(())) => Ok(self.stats.clone()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(e), Err(drain_err)) => {
                error!(error = %drain_err, "Final drain failed");
                Err(e)
            }
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn emitter(&self) -> &CheckpointEmitter<W> {
        &self.emitter
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Checkpoint observed since the last record, not yet attached
    pub fn pending_state(&self) -> Option<&Value> {
        self.pending_state.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_parts(self) -> (S, CheckpointEmitter<W>) {
        (self.sink, self.emitter)
    }

    async fn consume<R, F>(&mut self, reader: R, shutdown: F) -> Result<(), ContractError>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        let mut lines = reader.lines();
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(lines = self.stats.lines, "Stop requested, no more input is read");
                    self.stats.interrupted = true;
                    break;
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                debug!(lines = self.stats.lines, "End of input");
                break;
            };

            self.stats.lines += 1;
            if line.trim().is_empty() {
                continue;
            }

            let line_no = self.stats.lines;
            let message = parse_message(&line, line_no)?;
            self.handle(message, line_no).await?;
        }

        Ok(())
    }

    async fn handle(&mut self, message: Message, line_no: u64) -> Result<(), ContractError> {
        match message {
            Message::Schema(schema) => {
                self.stats.schemas += 1;
                debug!(
                    stream = %schema.stream,
                    keys = ?schema.key_properties,
                    "Schema received"
                );
                self.key_properties
                    .insert(schema.stream, schema.key_properties);
                Ok(())
            }
            Message::State(state) => {
                self.stats.states += 1;
                self.pending_state = state.into_token();
                Ok(())
            }
            Message::Record(record) => self.handle_record(record, line_no).await,
        }
    }

    async fn handle_record(
        &mut self,
        message: RecordMessage,
        line_no: u64,
    ) -> Result<(), ContractError> {
        let RecordMessage { stream, record } = message;

        let keys = match self.key_properties.get(&stream) {
            Some(keys) => Value::from(keys.clone()),
            None => return Err(ContractError::UnknownStream { stream }),
        };

        let Value::Object(mut row) = record else {
            return Err(ContractError::protocol(
                line_no,
                format!("record for stream '{stream}' is not a JSON object"),
            ));
        };
        row.insert(KEYS_FIELD.to_string(), keys);
        let row = Value::Object(row);

        self.stats.records += 1;
        let token = self.pending_state.take();
        if let Some(batch) = self.sink.push(&stream, &row, token).await? {
            self.acknowledge(&batch)?;
        }

        Ok(())
    }

    fn acknowledge(&mut self, batch: &PersistedBatch) -> Result<(), ContractError> {
        self.stats.batches += 1;
        self.stats.records_persisted += batch.record_count as u64;

        if self.emitter.acknowledge(batch)?.is_some() {
            self.stats.checkpoints += 1;
        }
        Ok(())
    }

    /// Drain the sink, then emit the trailing state
    async fn shutdown(&mut self) -> Result<(), ContractError> {
        loop {
            match self.sink.flush_next().await {
                Ok(Some(batch)) => self.acknowledge(&batch)?,
                Ok(None) => break,
                Err(e) => {
                    if e.is_downstream_failure() {
                        self.emitter.fence();
                    }
                    return Err(e);
                }
            }
        }

        if let Some(state) = self.pending_state.take() {
            if self.emitter.emit(state)? {
                self.stats.checkpoints += 1;
            }
        }

        Ok(())
    }
}
