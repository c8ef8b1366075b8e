//! Payloads that cross a process boundary.
//!
//! - [`EventSubmission`] is what callers `POST /process`.
//! - [`ValidatedEvent`] is the body of every queue message.
//! - [`StoredRecord`] is the content of every stored object.
//! - [`StatusResponse`] / [`ErrorResponse`] are the ingress response bodies.

pub mod record;
pub mod response;
pub mod submission;

pub use record::{StoredRecord, ValidatedEvent};
pub use response::{ErrorResponse, StatusResponse};
pub use submission::{EventFields, EventSubmission};
