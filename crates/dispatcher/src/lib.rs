//! # Dispatcher
//!
//! Batch transfer module.
//!
//! Responsible for:
//! - Grouping a batch by destination table (stable, first-seen order)
//! - Serializing each group into one JSON array
//! - One transfer per group, fail-fast on the first rejection

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod transports;

pub use contracts::{Batch, Transport, TransferRequest, TransferResponse};
pub use dispatcher::{group_by_table, DispatchReport, Dispatcher, GroupReport, TableGroup};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use transports::{HttpTransport, HttpTransportConfig, MockTransport};
