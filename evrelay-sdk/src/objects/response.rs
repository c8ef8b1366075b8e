//! Ingress response bodies.

use serde::{Deserialize, Serialize};

/// Body of a successful `POST /process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    /// Identifier the queue assigned to the enqueued message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl StatusResponse {
    pub const QUEUED: &'static str = "Message sent to queue";

    /// Confirmation that the message with `message_id` was enqueued.
    pub fn queued(message_id: impl Into<String>) -> Self {
        Self {
            status: Self::QUEUED.to_owned(),
            message_id: Some(message_id.into()),
        }
    }
}

/// Body of every non-2xx ingress response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
