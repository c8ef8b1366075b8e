//! Configuration types for the relay pipeline.
//!
//! These types represent the validated runtime configuration. Loading them
//! from files, flags and the environment is handled by the server crate.

mod object_key;
mod worker;

pub use object_key::ObjectKeyLayout;
pub use worker::{MAX_BATCH_SIZE, WorkerConfig};
