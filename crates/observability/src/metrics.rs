//! Connector metrics
//!
//! Thin wrappers over the `metrics` macros so that metric names live in
//! one place. Without an installed recorder these are no-ops.

use metrics::{counter, gauge, histogram};

/// Record one record accepted by the buffer
pub fn record_record_enqueued(table: &str) {
    counter!(
        "target_magentobi_records_enqueued_total",
        "table" => table.to_string()
    )
    .increment(1);
}

/// Record current buffer depth and byte size
pub fn record_buffer_state(len: usize, bytes: usize) {
    gauge!("target_magentobi_buffer_records").set(len as f64);
    gauge!("target_magentobi_buffer_bytes").set(bytes as f64);
}

/// Record one successful table request
pub fn record_request_sent(table: &str, records: usize, bytes: usize) {
    counter!(
        "target_magentobi_requests_total",
        "table" => table.to_string(),
        "status" => "success"
    )
    .increment(1);
    counter!(
        "target_magentobi_records_sent_total",
        "table" => table.to_string()
    )
    .increment(records as u64);
    histogram!("target_magentobi_request_bytes").record(bytes as f64);
}

/// Record one fully persisted batch
pub fn record_batch_dispatched(records: usize) {
    counter!("target_magentobi_batches_total").increment(1);
    histogram!("target_magentobi_batch_records").record(records as f64);
}

/// Record a rejected (`Some(status)`) or unanswered (`None`) request
pub fn record_transfer_failure(table: &str, status: Option<u16>) {
    let status = status.map_or_else(|| "unanswered".to_string(), |s| s.to_string());
    counter!(
        "target_magentobi_requests_total",
        "table" => table.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record one checkpoint line written to the output
pub fn record_checkpoint_emitted() {
    counter!("target_magentobi_checkpoints_emitted_total").increment(1);
}
