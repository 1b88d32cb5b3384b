//! FIFO record buffer with running byte accounting.
//!
//! Readiness and assembly are separate steps:
//! - `take_ready_batch` checks the byte/count/age thresholds first
//! - `drain` skips the check and keeps assembling until the queue is empty
//!
//! Both share one assembly routine, so the hard byte ceiling and the
//! per-batch message cap hold for every batch that leaves the buffer.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use contracts::{
    Batch, BufferEntry, CheckpointToken, ContractError, RecordPayload, ARRAY_WRAPPER_BYTES,
    MAX_BATCH_SIZE_BYTES, MAX_MESSAGES_PER_BATCH, MAX_RECORD_BYTES, SEPARATOR_BYTES,
};
use tracing::trace;

/// Which threshold made the buffer ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Buffered bytes reached the target
    Bytes,
    /// Buffered records reached the per-batch cap
    Count,
    /// Oldest record reached the maximum age
    Age,
}

/// Pending records awaiting dispatch
#[derive(Default)]
pub struct RecordBuffer {
    queue: VecDeque<BufferEntry>,
    available_bytes: usize,
}

impl fmt::Debug for RecordBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordBuffer")
            .field("len", &self.queue.len())
            .field("available_bytes", &self.available_bytes)
            .finish()
    }
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a record stamped with the current time
    ///
    /// # Errors
    /// `OversizedRecord` when the record alone could never fit one transfer.
    #[inline]
    pub fn enqueue(
        &mut self,
        payload: RecordPayload,
        checkpoint_token: CheckpointToken,
    ) -> Result<(), ContractError> {
        self.enqueue_at(payload, checkpoint_token, Instant::now())
    }

    /// Queue a record with an explicit enqueue time
    pub fn enqueue_at(
        &mut self,
        payload: RecordPayload,
        checkpoint_token: CheckpointToken,
        now: Instant,
    ) -> Result<(), ContractError> {
        let size = payload.serialized_len();
        if size > MAX_RECORD_BYTES {
            return Err(ContractError::OversizedRecord {
                size,
                max: MAX_RECORD_BYTES,
            });
        }

        self.queue
            .push_back(BufferEntry::new(payload, checkpoint_token, now));
        self.available_bytes += size;
        Ok(())
    }

    /// Assemble a batch if any readiness threshold holds
    ///
    /// A negative check leaves the queue untouched.
    #[inline]
    pub fn take_ready_batch(&mut self, target_bytes: usize, max_age: Duration) -> Option<Batch> {
        self.take_ready_batch_at(target_bytes, max_age, Instant::now())
    }

    /// `take_ready_batch` evaluated at `now`
    pub fn take_ready_batch_at(
        &mut self,
        target_bytes: usize,
        max_age: Duration,
        now: Instant,
    ) -> Option<Batch> {
        let reason = self.readiness_at(target_bytes, max_age, now)?;
        trace!(
            ?reason,
            len = self.queue.len(),
            bytes = self.available_bytes,
            "Buffer ready"
        );
        self.assemble()
    }

    /// First threshold that holds at `now`, `None` when empty or not ready
    pub fn readiness_at(
        &self,
        target_bytes: usize,
        max_age: Duration,
        now: Instant,
    ) -> Option<Readiness> {
        let oldest = self.queue.front()?;

        if self.available_bytes >= target_bytes {
            Some(Readiness::Bytes)
        } else if self.queue.len() >= MAX_MESSAGES_PER_BATCH {
            Some(Readiness::Count)
        } else if now.saturating_duration_since(oldest.enqueue_time()) >= max_age {
            Some(Readiness::Age)
        } else {
            None
        }
    }

    /// Lazily assemble batches until the queue is empty
    ///
    /// Each yielded batch respects the byte ceiling, so a large backlog
    /// comes out as several batches. Entries not yet yielded stay queued if
    /// the iterator is dropped early.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { buffer: self }
    }

    /// Number of queued records
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Sum of the serialized sizes of all queued records
    #[inline]
    pub fn available_bytes(&self) -> usize {
        self.available_bytes
    }

    /// Pop entries from the front while the running array size stays
    /// under the ceiling.
    ///
    /// The first entry is always taken: enqueue already guaranteed it fits
    /// inside its own array.
    fn assemble(&mut self) -> Option<Batch> {
        let mut entries = Vec::new();
        let mut size = ARRAY_WRAPPER_BYTES;

        while let Some(next) = self.queue.front() {
            if entries.len() >= MAX_MESSAGES_PER_BATCH {
                break;
            }

            let next_size = next.serialized_len();
            let separator = if entries.is_empty() { 0 } else { SEPARATOR_BYTES };
            if !entries.is_empty() && size + separator + next_size >= MAX_BATCH_SIZE_BYTES {
                break;
            }

            let Some(entry) = self.queue.pop_front() else {
                break;
            };
            size += separator + next_size;
            self.available_bytes -= next_size;
            entries.push(entry);
        }

        Batch::from_entries(entries)
    }
}

/// Iterator returned by [`RecordBuffer::drain`]
pub struct Drain<'a> {
    buffer: &'a mut RecordBuffer,
}

impl Iterator for Drain<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        self.buffer.assemble()
    }
}
