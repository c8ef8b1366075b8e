//! Worker loop tuning.

use std::time::Duration;

/// Upper bound the queue service accepts for a single receive call.
pub const MAX_BATCH_SIZE: usize = 10;

/// Tuning of the poll-store-acknowledge cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Messages requested per receive call (at most [`MAX_BATCH_SIZE`]).
    pub batch_size: usize,
    /// Long-poll wait of a single receive call.
    pub wait_time: Duration,
    /// Pause after each cycle before polling again.
    pub idle_interval: Duration,
    /// Messages of one batch processed concurrently. `1` processes a batch
    /// strictly in order.
    pub max_in_flight: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            wait_time: Duration::from_secs(5),
            idle_interval: Duration::from_secs(10),
            max_in_flight: 1,
        }
    }
}
