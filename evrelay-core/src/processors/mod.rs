//! Pipeline processors.
//!
//! Ingress side:
//! - `QueuePublisher`: receives `ValidatedEvent`, sends it to the queue
//!
//! Worker side, composed by `RelayWorker`:
//! - `QueuePoller`: receives `PollBatch`, long-polls the queue
//! - `StoreWriter`: receives `StoreMessage`, writes the stored object
//! - `Acknowledger`: receives `AcknowledgeMessage`, deletes the queue message

pub mod acknowledger;
pub mod poller;
pub mod publisher;
pub mod store_writer;
pub mod worker;

pub use acknowledger::{AckError, AcknowledgeMessage, Acknowledger};
pub use poller::{PollBatch, QueuePoller};
pub use publisher::{PublishError, QueuePublisher};
pub use store_writer::{StoreMessage, StoreWriter};
pub use worker::{CycleReport, RelayWorker};
