//! In-process registry
//!
//! Implements both `RegistryClient` and `LivenessProvider` on top of
//! concurrent maps. Used by the sandbox binary and by tests, which can
//! inject failures to exercise the error paths of the callers.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{
    Check, CheckOutcome, DiscoveryError, DiscoveryResult, LivenessProvider, Member,
    RegistryClient,
};

/// A TTL check update received by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedCheck {
    pub check_id: String,
    pub outcome: CheckOutcome,
    pub note: String,
}

/// Registry state held in memory
#[derive(Default)]
pub struct InMemoryRegistry {
    /// Checks by node name
    checks: DashMap<String, Vec<Check>>,
    /// Gossip members by name
    members: DashMap<String, Member>,
    /// TTL check updates, in arrival order
    reports: Mutex<Vec<ReportedCheck>>,
    fail_reports: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check on its node
    pub fn put_check(&self, check: Check) {
        self.checks.entry(check.node.clone()).or_default().push(check);
    }

    /// Drop every check registered on a node
    pub fn clear_node(&self, node: &str) {
        self.checks.remove(node);
    }

    /// Add or replace a gossip member
    pub fn put_member(&self, member: Member) {
        self.members.insert(member.name.clone(), member);
    }

    pub fn remove_member(&self, name: &str) {
        self.members.remove(name);
    }

    /// Make every subsequent `report_check` fail
    pub fn fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent check query and membership lookup fail
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// All TTL check updates received so far
    pub fn reports(&self) -> Vec<ReportedCheck> {
        self.reports.lock().clone()
    }

    /// TTL check updates received for one check id
    pub fn reports_for(&self, check_id: &str) -> Vec<ReportedCheck> {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.check_id == check_id)
            .cloned()
            .collect()
    }

    fn ensure_readable(&self) -> DiscoveryResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DiscoveryError::Unavailable("registry reads disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn report_check(
        &self,
        check_id: &str,
        outcome: CheckOutcome,
        note: &str,
    ) -> DiscoveryResult<()> {
        if self.fail_reports.load(Ordering::SeqCst) {
            return Err(DiscoveryError::Registry(format!(
                "check update rejected for {check_id}"
            )));
        }
        debug!(check_id = %check_id, outcome = %outcome, "TTL check updated");
        self.reports.lock().push(ReportedCheck {
            check_id: check_id.to_string(),
            outcome,
            note: note.to_string(),
        });
        Ok(())
    }

    async fn node_checks(&self, node: &str) -> DiscoveryResult<Vec<Check>> {
        self.ensure_readable()?;
        Ok(self
            .checks
            .get(node)
            .map(|c| c.value().clone())
            .unwrap_or_default())
    }

    async fn service_checks(&self, service_name: &str) -> DiscoveryResult<Vec<Check>> {
        self.ensure_readable()?;
        Ok(self
            .checks
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|c| c.service_name.as_deref() == Some(service_name))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect())
    }
}

#[async_trait]
impl LivenessProvider for InMemoryRegistry {
    async fn members(&self) -> DiscoveryResult<Vec<Member>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DiscoveryError::Liveness("agent members unavailable".to_string()));
        }
        Ok(self.members.iter().map(|m| m.value().clone()).collect())
    }
}
