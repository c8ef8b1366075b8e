//! evrelay server
//!
//! HTTP ingress and queue worker of the event relay.

pub mod api;
pub mod config;
pub mod modes;
pub mod server;
pub mod shutdown;
pub mod state;
