//! QueuePoller processor.
//!
//! A failed receive is logged and reported as an empty batch so that a
//! transient queue outage never stops the worker loop.

use crate::backends::{MessageQueue, QueueMessage};
use crate::config::{MAX_BATCH_SIZE, WorkerConfig};
use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Request for one long-poll receive.
#[derive(Debug, Clone, Copy)]
pub struct PollBatch;

/// Long-polls the queue for batches of pending messages.
#[derive(Clone)]
pub struct QueuePoller {
    queue: Arc<dyn MessageQueue>,
    batch_size: usize,
    wait_time: Duration,
}

impl QueuePoller {
    pub fn new(queue: Arc<dyn MessageQueue>, config: &WorkerConfig) -> Self {
        Self {
            queue,
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            wait_time: config.wait_time,
        }
    }
}

impl Processor<PollBatch> for QueuePoller {
    type Output = Vec<QueueMessage>;
    type Error = Infallible;
    #[tracing::instrument(skip_all, name = "Queue:Poll")]
    async fn process(&self, _: PollBatch) -> Result<Vec<QueueMessage>, Infallible> {
        match self.queue.receive(self.batch_size, self.wait_time).await {
            Ok(batch) => {
                if batch.is_empty() {
                    debug!("No messages found");
                } else {
                    debug!(count = batch.len(), "Received messages");
                }
                Ok(batch)
            }
            Err(e) => {
                warn!(error = %e, "Failed to receive messages, treating as empty batch");
                Ok(Vec::new())
            }
        }
    }
}
