//! # Session
//!
//! Composition root of the connector.
//!
//! Responsibilities:
//! - Decode Singer lines and track each stream's key properties
//! - Attach the pending state to the next record and hand it to a sink
//! - Emit a checkpoint line for every persisted batch
//! - Drain the sink exactly once when the input ends
//!
//! ## Usage Example
//!
//! ```ignore
//! use session::{BatchSettings, BufferedSink, Session};
//!
//! let sink = BufferedSink::new("magentobi", BatchSettings::from_target_config(&config), transport);
//! let mut session = Session::new(sink, std::io::stdout());
//! let stats = session.run(tokio::io::BufReader::new(tokio::io::stdin())).await?;
//! stats.log_summary();
//! ```

mod checkpoint;
mod session;
mod sinks;
mod stats;

pub use checkpoint::{latest_of, CheckpointEmitter};
pub use session::{Session, KEYS_FIELD};
pub use sinks::{BatchSettings, BufferedSink, DryRunSink, DRY_RUN_BATCH_SIZE};
pub use stats::SessionStats;
