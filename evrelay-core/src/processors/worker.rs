//! RelayWorker: the poll-store-acknowledge loop.
//!
//! The loop alternates between two states:
//! - **Idle**: no batch in hand. Poll the queue; an empty or failed poll
//!   stays idle.
//! - **Processing**: handle every message of the fetched batch. Each
//!   message is stored, and only a stored message is acknowledged. A failure
//!   at either step leaves the message in the queue for a later delivery.
//!
//! After each cycle the worker pauses for `idle_interval` before polling
//! again. It runs until the shutdown signal fires; whatever is in flight at
//! that point is dropped unacknowledged and will be redelivered.

use super::acknowledger::{AcknowledgeMessage, Acknowledger};
use super::poller::{PollBatch, QueuePoller};
use super::store_writer::{StoreMessage, StoreWriter};
use crate::backends::{MessageQueue, ObjectStore, QueueMessage};
use crate::config::{ObjectKeyLayout, WorkerConfig};
use futures_util::stream::{self, StreamExt};
use kanau::processor::Processor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Counts for one poll-process cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub received: usize,
    /// Messages whose object was written, acknowledged or not.
    pub stored: usize,
    pub acknowledged: usize,
    /// Messages left in the queue because the store or the delete failed.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageOutcome {
    Acknowledged,
    StoreFailed,
    AckFailed,
}

impl CycleReport {
    fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Acknowledged => {
                self.stored += 1;
                self.acknowledged += 1;
            }
            MessageOutcome::StoreFailed => self.failed += 1,
            MessageOutcome::AckFailed => {
                self.stored += 1;
                self.failed += 1;
            }
        }
    }
}

/// Drains the queue into the object store.
pub struct RelayWorker {
    poller: QueuePoller,
    writer: StoreWriter,
    acknowledger: Acknowledger,
    idle_interval: Duration,
    max_in_flight: usize,
}

impl RelayWorker {
    /// Create a new RelayWorker.
    ///
    /// # Arguments
    ///
    /// * `queue` - Queue to drain; also used for acknowledgements
    /// * `store` - Destination of the stored objects
    /// * `config` - Batch size, waits and concurrency
    /// * `layout` - Object key derivation
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn ObjectStore>,
        config: &WorkerConfig,
        layout: ObjectKeyLayout,
    ) -> Self {
        Self {
            poller: QueuePoller::new(queue.clone(), config),
            writer: StoreWriter::new(store, layout),
            acknowledger: Acknowledger::new(queue),
            idle_interval: config.idle_interval,
            max_in_flight: config.max_in_flight.max(1),
        }
    }

    /// Run the worker until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            idle_interval = ?self.idle_interval,
            max_in_flight = self.max_in_flight,
            "RelayWorker started"
        );

        loop {
            let report = tokio::select! {
                biased;

                _ = shutdown_requested(&mut shutdown_rx) => {
                    info!("RelayWorker received shutdown signal");
                    break;
                }

                report = self.run_cycle() => report,
            };

            if report.received > 0 {
                info!(
                    received = report.received,
                    stored = report.stored,
                    acknowledged = report.acknowledged,
                    failed = report.failed,
                    "Batch processed"
                );
            }

            tokio::select! {
                biased;

                _ = shutdown_requested(&mut shutdown_rx) => {
                    info!("RelayWorker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.idle_interval) => {}
            }
        }

        info!("RelayWorker shutdown complete");
    }

    /// Poll once and process the whole batch.
    pub async fn run_cycle(&self) -> CycleReport {
        let batch = match self.poller.process(PollBatch).await {
            Ok(batch) => batch,
            Err(never) => match never {},
        };

        let mut report = CycleReport {
            received: batch.len(),
            ..CycleReport::default()
        };
        if batch.is_empty() {
            return report;
        }

        let outcomes: Vec<MessageOutcome> = stream::iter(batch)
            .map(|message| self.handle_message(message))
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }
        report
    }

    /// Store one message, then acknowledge it if the store succeeded.
    async fn handle_message(&self, message: QueueMessage) -> MessageOutcome {
        let QueueMessage {
            message_id,
            body,
            receipt_handle,
        } = message;
        debug!(%message_id, "Processing message");

        let stored = self
            .writer
            .process(StoreMessage {
                message_id: message_id.clone(),
                body,
            })
            .await;
        if let Err(e) = stored {
            error!(
                %message_id,
                error = %e,
                "Failed to store message, leaving it for redelivery"
            );
            return MessageOutcome::StoreFailed;
        }

        match self
            .acknowledger
            .process(AcknowledgeMessage {
                message_id,
                receipt_handle,
            })
            .await
        {
            Ok(()) => MessageOutcome::Acknowledged,
            Err(e) => {
                warn!(error = %e, "Stored message was not acknowledged, it will be redelivered");
                MessageOutcome::AckFailed
            }
        }
    }
}

/// Completes once shutdown is requested or the signal sender is gone.
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::{InMemoryObjectStore, InMemoryQueue};
    use crate::backends::{QueueError, StoreError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use evrelay_sdk::objects::StoredRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` puts, then delegates.
    struct FlakyStore {
        inner: InMemoryObjectStore,
        failures: AtomicUsize,
    }

    impl FlakyStore {
        fn new(failures: usize) -> Self {
            Self {
                inner: InMemoryObjectStore::new(),
                failures: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn put(&self, key: &str, content: Bytes) -> Result<(), StoreError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::service("bucket unavailable"));
            }
            self.inner.put(key, content).await
        }
    }

    /// Delegates everything but rejects the first `failures` deletes.
    struct StickyQueue {
        inner: InMemoryQueue,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl MessageQueue for StickyQueue {
        async fn send(&self, body: String) -> Result<String, QueueError> {
            self.inner.send(body).await
        }

        async fn receive(
            &self,
            max_messages: usize,
            wait_time: Duration,
        ) -> Result<Vec<QueueMessage>, QueueError> {
            self.inner.receive(max_messages, wait_time).await
        }

        async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(QueueError::InvalidReceiptHandle);
            }
            self.inner.delete(receipt_handle).await
        }
    }

    /// Delegates everything and records the handles it hands out and the
    /// handles it is asked to delete.
    struct RecordingQueue {
        inner: InMemoryQueue,
        received: std::sync::Mutex<Vec<String>>,
        delete_calls: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingQueue {
        fn new(inner: InMemoryQueue) -> Self {
            Self {
                inner,
                received: std::sync::Mutex::new(Vec::new()),
                delete_calls: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn received(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }

        fn delete_calls(&self) -> Vec<String> {
            self.delete_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageQueue for RecordingQueue {
        async fn send(&self, body: String) -> Result<String, QueueError> {
            self.inner.send(body).await
        }

        async fn receive(
            &self,
            max_messages: usize,
            wait_time: Duration,
        ) -> Result<Vec<QueueMessage>, QueueError> {
            let batch = self.inner.receive(max_messages, wait_time).await?;
            self.received
                .lock()
                .unwrap()
                .extend(batch.iter().map(|m| m.receipt_handle.clone()));
            Ok(batch)
        }

        async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
            self.delete_calls
                .lock()
                .unwrap()
                .push(receipt_handle.to_owned());
            self.inner.delete(receipt_handle).await
        }
    }

    fn config() -> WorkerConfig {
        WorkerConfig {
            wait_time: Duration::ZERO,
            idle_interval: Duration::from_millis(10),
            ..WorkerConfig::default()
        }
    }

    fn worker(queue: Arc<dyn MessageQueue>, store: Arc<dyn ObjectStore>) -> RelayWorker {
        RelayWorker::new(queue, store, &config(), ObjectKeyLayout::default())
    }

    #[tokio::test]
    async fn test_single_message_is_stored_then_deleted() {
        let queue = Arc::new(RecordingQueue::new(InMemoryQueue::default()));
        let store = Arc::new(InMemoryObjectStore::new());
        let message_id = queue.send("hello".to_string()).await.unwrap();

        let report = worker(queue.clone(), store.clone()).run_cycle().await;

        assert_eq!(
            report,
            CycleReport {
                received: 1,
                stored: 1,
                acknowledged: 1,
                failed: 0,
            }
        );
        let key = format!("messages/{message_id}.json");
        assert_eq!(store.keys().await, vec![key.clone()]);
        let record: StoredRecord = serde_json::from_slice(&store.get(&key).await.unwrap()).unwrap();
        assert_eq!(record, StoredRecord::new(message_id, "hello"));
        let received = queue.received();
        assert_eq!(received.len(), 1);
        assert_eq!(queue.delete_calls(), received);
        assert!(queue.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failure_skips_delete_and_message_is_redelivered() {
        let queue = Arc::new(RecordingQueue::new(InMemoryQueue::new(Duration::ZERO)));
        let store = Arc::new(FlakyStore::new(1));
        let message_id = queue.send("hello".to_string()).await.unwrap();
        let worker = worker(queue.clone(), store.clone());

        let first = worker.run_cycle().await;
        assert_eq!(first.failed, 1);
        assert_eq!(first.acknowledged, 0);
        assert!(queue.delete_calls().is_empty());
        assert_eq!(queue.inner.len().await, 1);

        let second = worker.run_cycle().await;
        assert_eq!(second.received, 1);
        assert_eq!(second.acknowledged, 1);
        assert_eq!(queue.inner.receive_count(&message_id).await, None);
        let received = queue.received();
        assert_eq!(received.len(), 2);
        assert_eq!(queue.delete_calls(), vec![received[1].clone()]);
        assert_eq!(store.inner.len().await, 1);
    }

    #[tokio::test]
    async fn test_ack_failure_leads_to_idempotent_rewrite() {
        let queue = Arc::new(StickyQueue {
            inner: InMemoryQueue::new(Duration::ZERO),
            failures: AtomicUsize::new(1),
        });
        let store = Arc::new(InMemoryObjectStore::new());
        queue.send("hello".to_string()).await.unwrap();
        let worker = worker(queue.clone(), store.clone());

        let first = worker.run_cycle().await;
        assert_eq!((first.stored, first.acknowledged, first.failed), (1, 0, 1));

        let second = worker.run_cycle().await;
        assert_eq!((second.stored, second.acknowledged, second.failed), (1, 1, 0));

        assert_eq!(store.put_count(), 2);
        assert_eq!(store.len().await, 1);
        assert!(queue.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_failure_of_one_message_does_not_block_the_batch() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(FlakyStore::new(1));
        for i in 0..3 {
            queue.send(format!("m{i}")).await.unwrap();
        }

        let report = worker(queue.clone(), store.clone()).run_cycle().await;

        assert_eq!(report.received, 3);
        assert_eq!(report.acknowledged, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(queue.bodies().await, vec!["m0".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_poll_reports_nothing() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryObjectStore::new());
        let report = worker(queue, store.clone()).run_cycle().await;
        assert_eq!(report, CycleReport::default());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_processing_handles_every_message() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryObjectStore::new());
        for i in 0..10 {
            queue.send(format!("m{i}")).await.unwrap();
        }
        let worker = RelayWorker::new(
            queue.clone(),
            store.clone(),
            &WorkerConfig {
                max_in_flight: 4,
                ..config()
            },
            ObjectKeyLayout::default(),
        );

        let report = worker.run_cycle().await;

        assert_eq!(report.acknowledged, 10);
        assert_eq!(store.len().await, 10);
        assert!(queue.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_drains_queue_until_shutdown() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryObjectStore::new());
        for i in 0..12 {
            queue.send(format!("m{i}")).await.unwrap();
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker(queue.clone(), store.clone()).run(shutdown_rx));

        // Two cycles are needed for twelve messages; both fit well within a second.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.len().await, 12);
        assert!(queue.is_empty().await);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_pauses_between_cycles() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryObjectStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = RelayWorker::new(
            queue.clone(),
            store.clone(),
            &WorkerConfig {
                wait_time: Duration::ZERO,
                ..WorkerConfig::default()
            },
            ObjectKeyLayout::default(),
        );
        let handle = tokio::spawn(worker.run(shutdown_rx));

        // First cycle has run and found nothing; the worker is now idling.
        tokio::time::sleep(Duration::from_secs(1)).await;
        queue.send("late".to_string()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.is_empty().await);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.len().await, 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
