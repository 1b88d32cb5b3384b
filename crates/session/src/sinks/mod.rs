//! Sink implementations
//!
//! Contains BufferedSink and DryRunSink.

mod buffered;
mod dry_run;

pub use self::buffered::{BatchSettings, BufferedSink};
pub use self::dry_run::{DryRunSink, DRY_RUN_BATCH_SIZE};
