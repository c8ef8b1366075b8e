//! StoreWriter processor.
//!
//! Writes one dequeued message as a stored object. The object key depends
//! only on the message id, so a redelivered message overwrites its earlier
//! copy instead of adding a second object.

use crate::backends::{ObjectStore, StoreError};
use crate::config::ObjectKeyLayout;
use bytes::Bytes;
use evrelay_sdk::objects::StoredRecord;
use kanau::processor::Processor;
use std::sync::Arc;
use tracing::info;

/// A dequeued message to persist.
#[derive(Debug, Clone)]
pub struct StoreMessage {
    pub message_id: String,
    pub body: String,
}

/// Persists dequeued messages to the object store.
#[derive(Clone)]
pub struct StoreWriter {
    store: Arc<dyn ObjectStore>,
    layout: ObjectKeyLayout,
}

impl StoreWriter {
    pub fn new(store: Arc<dyn ObjectStore>, layout: ObjectKeyLayout) -> Self {
        Self { store, layout }
    }
}

impl Processor<StoreMessage> for StoreWriter {
    /// Key of the written object.
    type Output = String;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "Store:Put", fields(message_id = %message.message_id))]
    async fn process(&self, message: StoreMessage) -> Result<String, StoreError> {
        let key = self.layout.key_for(&message.message_id);
        let record = StoredRecord::new(message.message_id, message.body);
        let content = Bytes::from(record.to_json()?);

        self.store.put(&key, content).await?;
        info!(%key, "Message stored");
        Ok(key)
    }
}
