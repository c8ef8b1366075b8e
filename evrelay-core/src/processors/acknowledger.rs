//! Acknowledger processor.
//!
//! Deletes a message from the queue once its stored object has been written.
//! A failed delete is not fatal: the message reappears after its visibility
//! timeout and the idempotent store write makes reprocessing safe.

use crate::backends::{MessageQueue, QueueError};
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// A stored message whose delivery should be acknowledged.
#[derive(Debug, Clone)]
pub struct AcknowledgeMessage {
    pub message_id: String,
    pub receipt_handle: String,
}

/// The queue refused to delete a message.
#[derive(Debug, Error)]
#[error("failed to delete message {message_id}: {source}")]
pub struct AckError {
    pub message_id: String,
    #[source]
    pub source: QueueError,
}

/// Removes acknowledged messages from the queue.
#[derive(Clone)]
pub struct Acknowledger {
    queue: Arc<dyn MessageQueue>,
}

impl Acknowledger {
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self { queue }
    }
}

impl Processor<AcknowledgeMessage> for Acknowledger {
    type Output = ();
    type Error = AckError;
    #[tracing::instrument(skip_all, err, name = "Queue:Delete", fields(message_id = %ack.message_id))]
    async fn process(&self, ack: AcknowledgeMessage) -> Result<(), AckError> {
        match self.queue.delete(&ack.receipt_handle).await {
            Ok(()) => {
                info!("Message deleted from queue");
                Ok(())
            }
            Err(source) => Err(AckError {
                message_id: ack.message_id,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::InMemoryQueue;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acknowledge_deletes_message() {
        let queue = Arc::new(InMemoryQueue::default());
        queue.send("body".to_string()).await.unwrap();
        let message = queue.receive(1, Duration::ZERO).await.unwrap().remove(0);

        Acknowledger::new(queue.clone())
            .process(AcknowledgeMessage {
                message_id: message.message_id,
                receipt_handle: message.receipt_handle,
            })
            .await
            .unwrap();

        assert!(queue.is_empty().await);
        assert_eq!(queue.deleted_count().await, 1);
    }

    #[tokio::test]
    async fn test_stale_handle_is_reported_and_message_kept() {
        let queue = Arc::new(InMemoryQueue::new(Duration::ZERO));
        queue.send("body".to_string()).await.unwrap();
        let stale = queue.receive(1, Duration::ZERO).await.unwrap().remove(0);
        // Redelivery issues a new handle and invalidates the old one.
        let _current = queue.receive(1, Duration::ZERO).await.unwrap().remove(0);

        let err = Acknowledger::new(queue.clone())
            .process(AcknowledgeMessage {
                message_id: stale.message_id.clone(),
                receipt_handle: stale.receipt_handle,
            })
            .await
            .unwrap_err();

        assert_eq!(err.message_id, stale.message_id);
        assert!(matches!(err.source, QueueError::InvalidReceiptHandle));
        assert_eq!(queue.len().await, 1);
    }
}
