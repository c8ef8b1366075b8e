//! In-process backends.
//!
//! Used by the server's `local` mode and by tests. They keep the contracts of
//! the real services that the pipeline depends on: queue messages stay until
//! deleted, a delivery hides a message for the visibility timeout, every
//! delivery gets a fresh receipt handle, and puts overwrite by key.

use super::{
    MessageQueue, ObjectStore, QueueError, QueueMessage, SecretError, SecretSource, StoreError,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

// -- StaticSecretSource -------------------------------------------------

/// Secret source backed by a fixed name → value map.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretSource {
    values: HashMap<String, String>,
}

impl StaticSecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn fetch(&self, name: &str) -> Result<String, SecretError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(name.to_owned()))
    }
}

// -- InMemoryQueue ------------------------------------------------------

/// Queue with visibility-timeout semantics.
///
/// A receipt handle stays valid until the message is delivered again or
/// deleted. Deleting with an older handle fails with
/// [`QueueError::InvalidReceiptHandle`] and leaves the message untouched.
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    arrivals: Notify,
    visibility_timeout: Duration,
}

#[derive(Default)]
struct QueueState {
    entries: Vec<Entry>,
    deleted: u64,
}

struct Entry {
    message_id: String,
    body: String,
    visible_at: Instant,
    receipt_handle: Option<String>,
    receive_count: u32,
}

impl QueueState {
    fn take_visible(
        &mut self,
        now: Instant,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Vec<QueueMessage> {
        self.entries
            .iter_mut()
            .filter(|e| e.visible_at <= now)
            .take(max_messages)
            .map(|e| {
                let receipt_handle = Uuid::new_v4().to_string();
                e.receipt_handle = Some(receipt_handle.clone());
                e.visible_at = now + visibility_timeout;
                e.receive_count += 1;
                QueueMessage {
                    message_id: e.message_id.clone(),
                    body: e.body.clone(),
                    receipt_handle,
                }
            })
            .collect()
    }

    fn next_visible_at(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.visible_at).min()
    }
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            arrivals: Notify::new(),
            visibility_timeout,
        }
    }

    /// Messages not yet deleted, in flight or not.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Bodies of all messages not yet deleted, oldest first.
    pub async fn bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .map(|e| e.body.clone())
            .collect()
    }

    /// Number of successful deletes so far.
    pub async fn deleted_count(&self) -> u64 {
        self.state.lock().await.deleted
    }

    /// How many times the message has been delivered, if it still exists.
    pub async fn receive_count(&self, message_id: &str) -> Option<u32> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .find(|e| e.message_id == message_id)
            .map(|e| e.receive_count)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send(&self, body: String) -> Result<String, QueueError> {
        let message_id = Uuid::new_v4().to_string();
        self.state.lock().await.entries.push(Entry {
            message_id: message_id.clone(),
            body,
            visible_at: Instant::now(),
            receipt_handle: None,
            receive_count: 0,
        });
        self.arrivals.notify_one();
        Ok(message_id)
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        if max_messages == 0 {
            return Ok(Vec::new());
        }
        let deadline = Instant::now() + wait_time;
        loop {
            let notified = self.arrivals.notified();
            let next_visible = {
                let mut state = self.state.lock().await;
                let batch =
                    state.take_visible(Instant::now(), max_messages, self.visibility_timeout);
                if !batch.is_empty() {
                    return Ok(batch);
                }
                state.next_visible_at()
            };

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            // Wake on a new send, on a hidden message becoming visible, or at the deadline.
            let wake_at = next_visible.map_or(deadline, |at| at.min(deadline));
            let _ = tokio::time::timeout_at(wake_at, notified).await;
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let position = state
            .entries
            .iter()
            .position(|e| e.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or(QueueError::InvalidReceiptHandle)?;
        state.entries.remove(position);
        state.deleted += 1;
        Ok(())
    }
}

// -- InMemoryObjectStore ------------------------------------------------

/// Object store backed by an ordered map.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
    puts: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of successful puts, overwrites included.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, content: Bytes) -> Result<(), StoreError> {
        self.objects.write().await.insert(key.to_owned(), content);
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
