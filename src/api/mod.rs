//! Relay Handler: HTTP routes and the upstream-to-body forwarder.

pub mod handler;
pub mod relay;

pub use handler::{AppState, router};
