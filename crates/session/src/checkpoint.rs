//! Checkpoint Emitter - turns persisted batches into resume points

use std::io::Write;

use contracts::{CheckpointToken, ContractError, PersistedBatch};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Latest present token, scanning from the end
pub fn latest_of(tokens: &[CheckpointToken]) -> Option<&Value> {
    tokens.iter().rev().find_map(|token| token.as_ref())
}

/// Writes one JSON line per resolved checkpoint
///
/// Once fenced (after a failed transfer) nothing more is written.
pub struct CheckpointEmitter<W> {
    writer: W,
    fenced: bool,
    last_emitted: Option<Value>,
    emitted_count: u64,
}

impl<W: Write> CheckpointEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            fenced: false,
            last_emitted: None,
            emitted_count: 0,
        }
    }

    /// Report a persisted batch and emit its latest token
    ///
    /// Returns the emitted value, if any.
    pub fn acknowledge(&mut self, batch: &PersistedBatch) -> Result<Option<Value>, ContractError> {
        if self.fenced {
            warn!(
                records = batch.record_count,
                "Checkpoint withheld after an earlier transfer failure"
            );
            return Ok(None);
        }

        info!("Persisted batch of {} records to Magento BI", batch.record_count);

        let Some(latest) = latest_of(&batch.tokens).cloned() else {
            return Ok(None);
        };

        self.emit(latest.clone())?;
        Ok(Some(latest))
    }

    /// Write `value` as one line and flush
    ///
    /// Returns false when fenced.
    pub fn emit(&mut self, value: Value) -> Result<bool, ContractError> {
        if self.fenced {
            return Ok(false);
        }

        let line = serde_json::to_string(&value)?;
        debug!(state = %line, "Emitting state");

        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        observability::record_checkpoint_emitted();
        self.emitted_count += 1;
        self.last_emitted = Some(value);
        Ok(true)
    }

    /// Stop emitting for the rest of the run
    pub fn fence(&mut self) {
        self.fenced = true;
    }

    pub fn is_fenced(&self) -> bool {
        self.fenced
    }

    pub fn last_emitted(&self) -> Option<&Value> {
        self.last_emitted.as_ref()
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted_count
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}
