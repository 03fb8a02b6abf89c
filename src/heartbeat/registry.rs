//! Registry of locally owned services that need a TTL heartbeat
//!
//! Registration and deregistration happen on arbitrary tasks while the
//! scheduler iterates the same map, so entries live in a `DashMap` and the
//! scheduler only ever works on a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info};

/// Prefix of the check id of a service TTL check
pub const CHECK_ID_PREFIX: &str = "service:";

/// Error for malformed service ids
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Service id is empty")]
    EmptyServiceId,
    #[error("Invalid service id {0:?}: contains whitespace or control characters")]
    InvalidServiceId(String),
}

/// A locally owned service and the id of its TTL check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistration {
    pub service_id: String,
    pub check_id: String,
}

impl ServiceRegistration {
    /// Validate `service_id` and derive its check id
    pub fn new(service_id: &str) -> Result<Self, RegistrationError> {
        validate_service_id(service_id)?;
        Ok(Self {
            service_id: service_id.to_string(),
            check_id: check_id_for(service_id),
        })
    }
}

/// Check id of the TTL check of `service_id`
///
/// Ids already carrying the prefix are returned unchanged.
pub fn check_id_for(service_id: &str) -> String {
    if service_id.starts_with(CHECK_ID_PREFIX) {
        service_id.to_string()
    } else {
        format!("{CHECK_ID_PREFIX}{service_id}")
    }
}

fn validate_service_id(service_id: &str) -> Result<(), RegistrationError> {
    if service_id.trim().is_empty() {
        return Err(RegistrationError::EmptyServiceId);
    }
    if service_id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(RegistrationError::InvalidServiceId(service_id.to_string()));
    }
    Ok(())
}

/// Heartbeat state of one service
#[derive(Debug, Clone)]
pub struct HeartbeatRecord {
    pub registration: ServiceRegistration,
    /// Time of the last report, `None` until the first one
    pub last_heartbeat: Option<Instant>,
    /// Bumped by every `add`, so a stale report cannot mark a fresh record
    pub generation: u64,
}

impl HeartbeatRecord {
    fn new(registration: ServiceRegistration, generation: u64) -> Self {
        Self {
            registration,
            last_heartbeat: None,
            generation,
        }
    }

    /// Whether a report is due at `now`
    pub fn is_due(&self, now: Instant, interval: std::time::Duration) -> bool {
        match self.last_heartbeat {
            None => true,
            Some(last) => now >= last + interval,
        }
    }
}

/// Concurrent map of service id to heartbeat record
#[derive(Debug, Default)]
pub struct HeartbeatRegistry {
    records: DashMap<String, HeartbeatRecord>,
    generations: AtomicU64,
}

impl HeartbeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service to the heartbeat loop
    ///
    /// Overwrites any existing record, so the next tick reports immediately.
    pub fn add(&self, service_id: &str) -> Result<(), RegistrationError> {
        let registration = ServiceRegistration::new(service_id)?;
        info!(
            service_id = %service_id,
            check_id = %registration.check_id,
            "Service added to heartbeat loop"
        );
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        self.records.insert(
            service_id.to_string(),
            HeartbeatRecord::new(registration, generation),
        );
        Ok(())
    }

    /// Remove a service from the heartbeat loop, no-op if absent
    pub fn remove(&self, service_id: &str) -> Result<(), RegistrationError> {
        validate_service_id(service_id)?;
        if self.records.remove(service_id).is_some() {
            info!(service_id = %service_id, "Service removed from heartbeat loop");
        }
        Ok(())
    }

    /// Point-in-time copy of all records
    ///
    /// No shard lock is held once this returns.
    pub fn snapshot(&self) -> Vec<HeartbeatRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    /// Record a report made for the snapshot record `reported` at `at`
    ///
    /// Returns false if the service was removed or added again in the
    /// meantime. A removed entry is not recreated and a re-added one keeps
    /// its "never heartbeated" state.
    pub fn mark_heartbeat(&self, reported: &HeartbeatRecord, at: Instant) -> bool {
        let service_id = reported.registration.service_id.as_str();
        match self.records.get_mut(service_id) {
            Some(mut record) if record.generation == reported.generation => {
                record.last_heartbeat = Some(at);
                true
            }
            Some(_) => {
                debug!(service_id = %service_id, "Service re-added during heartbeat");
                false
            }
            None => {
                debug!(service_id = %service_id, "Service removed during heartbeat");
                false
            }
        }
    }

    /// Time of the last report for `service_id`
    pub fn last_heartbeat(&self, service_id: &str) -> Option<Instant> {
        self.records.get(service_id).and_then(|r| r.last_heartbeat)
    }

    pub fn contains(&self, service_id: &str) -> bool {
        self.records.contains_key(service_id)
    }

    /// Ids of all services in the loop
    pub fn service_ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
