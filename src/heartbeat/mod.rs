//! TTL heartbeats for locally registered services
//!
//! This module provides:
//! - A concurrent registry of services to heartbeat
//! - A fixed-rate scheduler turning the application health into
//!   pass/warn/fail TTL check updates

mod registry;
mod scheduler;

pub use registry::{
    check_id_for, HeartbeatRecord, HeartbeatRegistry, RegistrationError, ServiceRegistration,
    CHECK_ID_PREFIX,
};
pub use scheduler::{HeartbeatScheduler, TickSummary};
