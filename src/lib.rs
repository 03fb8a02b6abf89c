//! Service discovery health client
//!
//! Keeps locally registered services alive in the discovery registry through
//! TTL check updates, and narrows discovered server lists down to the
//! instances fit to receive traffic.

pub mod config;
pub mod discovery;
pub mod health;
pub mod heartbeat;
pub mod metrics;
