//! Queue message body and stored object content.

use serde::{Deserialize, Serialize};

/// The fields carried forward once a submission passed validation.
///
/// Its JSON encoding is the queue message body. Field order is fixed by the
/// struct definition, so the same event always encodes to the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedEvent {
    pub email_subject: Option<String>,
    pub email_sender: Option<String>,
    /// Unix epoch seconds.
    pub email_timestream: i64,
    pub email_content: Option<String>,
}

impl ValidatedEvent {
    /// Encode as a queue message body.
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a queue message body.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Content of the object written for one dequeued message.
///
/// `content` is the queue message body verbatim; the worker never
/// re-encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub message_id: String,
    pub content: String,
}

impl StoredRecord {
    pub fn new(message_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            content: content.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
