//! Application state shared across all request handlers.

use evrelay_core::auth::Authenticator;
use evrelay_core::processors::QueuePublisher;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
/// Nothing in it changes after startup, so handlers never lock.
#[derive(Clone)]
pub struct AppState {
    /// Authority token check, built once from the fetched secret.
    pub authenticator: Arc<Authenticator>,
    /// Enqueues validated events.
    pub publisher: QueuePublisher,
}

impl AppState {
    pub fn new(authenticator: Authenticator, publisher: QueuePublisher) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            publisher,
        }
    }
}
