//! QueuePublisher processor.

use crate::backends::{MessageQueue, QueueError};
use evrelay_sdk::objects::ValidatedEvent;
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while enqueueing an event. Never retried here.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to enqueue event: {0}")]
    Queue(#[from] QueueError),
}

/// Serializes validated events and hands them to the durable queue.
#[derive(Clone)]
pub struct QueuePublisher {
    queue: Arc<dyn MessageQueue>,
}

impl QueuePublisher {
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self { queue }
    }
}

impl Processor<ValidatedEvent> for QueuePublisher {
    type Output = String;
    type Error = PublishError;
    #[tracing::instrument(skip_all, err, name = "Queue:Publish")]
    async fn process(&self, event: ValidatedEvent) -> Result<String, PublishError> {
        let body = event.to_body()?;
        let message_id = self.queue.send(body).await?;
        info!(%message_id, "Event queued");
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::InMemoryQueue;
    use async_trait::async_trait;
    use std::time::Duration;

    struct UnavailableQueue;

    #[async_trait]
    impl MessageQueue for UnavailableQueue {
        async fn send(&self, _body: String) -> Result<String, QueueError> {
            Err(QueueError::service("queue unavailable"))
        }

        async fn receive(
            &self,
            _max_messages: usize,
            _wait_time: Duration,
        ) -> Result<Vec<crate::backends::QueueMessage>, QueueError> {
            Err(QueueError::service("queue unavailable"))
        }

        async fn delete(&self, _receipt_handle: &str) -> Result<(), QueueError> {
            Err(QueueError::service("queue unavailable"))
        }
    }

    fn event() -> ValidatedEvent {
        ValidatedEvent {
            email_subject: Some("Hi".to_string()),
            email_sender: Some("a@example.com".to_string()),
            email_timestream: 1_700_000_000,
            email_content: None,
        }
    }

    #[tokio::test]
    async fn test_publish_enqueues_encoded_event() {
        let queue = Arc::new(InMemoryQueue::default());
        let publisher = QueuePublisher::new(queue.clone());

        let message_id = publisher.process(event()).await.unwrap();

        let batch = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message_id, message_id);
        assert_eq!(ValidatedEvent::from_body(&batch[0].body).unwrap(), event());
    }

    #[tokio::test]
    async fn test_publish_surfaces_queue_error() {
        let publisher = QueuePublisher::new(Arc::new(UnavailableQueue));
        let err = publisher.process(event()).await.unwrap_err();
        assert!(matches!(err, PublishError::Queue(QueueError::Service(_))));
        assert!(err.to_string().contains("queue unavailable"));
    }
}
