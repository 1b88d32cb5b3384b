//! # Buffer
//!
//! Ordered record queue that decides when a batch is ready and how it is
//! cut to fit one transfer.
//!
//! ## Example
//!
//! ```ignore
//! use buffer::RecordBuffer;
//!
//! let mut buffer = RecordBuffer::new();
//! buffer.enqueue(payload, checkpoint_token)?;
//!
//! if let Some(batch) = buffer.take_ready_batch(target_bytes, max_age) {
//!     dispatcher.send(&batch).await?;
//! }
//!
//! // On shutdown
//! for batch in buffer.drain() {
//!     dispatcher.send(&batch).await?;
//! }
//! ```

mod buffer;

pub use buffer::{Drain, Readiness, RecordBuffer};

// Re-export contracts types
pub use contracts::{
    Batch, BufferEntry, CheckpointToken, RecordPayload, MAX_BATCH_SIZE_BYTES,
    MAX_MESSAGES_PER_BATCH, MAX_RECORD_BYTES,
};
