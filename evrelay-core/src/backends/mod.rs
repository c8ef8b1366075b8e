//! Seams to the external services the relay depends on.
//!
//! - [`SecretSource`]: read once at startup to obtain the shared token.
//! - [`MessageQueue`]: durable at-least-once queue with receipt-based delete.
//! - [`ObjectStore`]: key-addressed storage with overwrite-by-key puts.
//!
//! [`memory`] holds in-process implementations; `aws` (feature `aws`) holds
//! the SSM / SQS / S3 ones.

#[cfg(feature = "aws")]
pub mod aws;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Underlying cause reported by a backend client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from the secret-retrieval service.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret service error: {0}")]
    Service(#[source] BoxError),

    #[error("secret parameter {0} not found")]
    NotFound(String),

    #[error("secret parameter {0} is empty")]
    Empty(String),
}

/// Errors from the durable queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue service error: {0}")]
    Service(#[source] BoxError),

    /// A received message lacked a field every delivery must carry.
    #[error("queue returned a message without {0}")]
    MalformedMessage(&'static str),

    /// The receipt handle does not belong to a live delivery attempt.
    #[error("receipt handle is stale or unknown")]
    InvalidReceiptHandle,
}

impl QueueError {
    pub fn service(err: impl Into<BoxError>) -> Self {
        Self::Service(err.into())
    }
}

/// Errors from the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store error: {0}")]
    Service(#[source] BoxError),

    #[error("failed to encode stored record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn service(err: impl Into<BoxError>) -> Self {
        Self::Service(err.into())
    }
}

/// One delivery attempt of a queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Assigned by the queue on send; stable across redeliveries.
    pub message_id: String,
    pub body: String,
    /// Proof of this delivery attempt; needed to delete the message.
    pub receipt_handle: String,
}

/// Secret-retrieval service.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the decrypted value of the named parameter.
    async fn fetch(&self, name: &str) -> Result<String, SecretError>;
}

/// Durable message queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue `body` and return the queue-assigned message id.
    async fn send(&self, body: String) -> Result<String, QueueError>;

    /// Receive up to `max_messages`, waiting at most `wait_time` for the
    /// first one to become available.
    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Delete the message delivered with `receipt_handle`.
    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}

/// Durable object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `content` under `key`, replacing any existing object.
    async fn put(&self, key: &str, content: Bytes) -> Result<(), StoreError>;
}
