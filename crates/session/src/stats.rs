//! Session statistics

use std::time::Duration;

use tracing::info;

/// Counters from one session run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// Input lines read, blank ones included
    pub lines: u64,

    /// SCHEMA messages handled
    pub schemas: u64,

    /// RECORD messages handed to the sink
    pub records: u64,

    /// STATE messages observed
    pub states: u64,

    /// Batches the sink reported persisted
    pub batches: u64,

    /// Records in those batches
    pub records_persisted: u64,

    /// Checkpoint lines written
    pub checkpoints: u64,

    /// Input stopped by a stop request instead of end of input
    pub interrupted: bool,

    /// Wall time of the run
    pub duration: Duration,
}

impl SessionStats {
    /// Records per second persisted
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_persisted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Log a one-line summary
    pub fn log_summary(&self) {
        info!(
            lines = self.lines,
            records = self.records,
            states = self.states,
            batches = self.batches,
            records_persisted = self.records_persisted,
            checkpoints = self.checkpoints,
            interrupted = self.interrupted,
            duration_secs = format!("{:.2}", self.duration.as_secs_f64()),
            throughput = format!("{:.1}", self.throughput()),
            "Session summary"
        );
    }
}
