//! Wire types shared by the evrelay ingress, the relay worker and clients.
//!
//! Enable the `client` feature for a typed HTTP client of the ingress API.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
