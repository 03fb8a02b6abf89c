//! Integration test entry point
//!
//! Drives the public API end to end against the in-memory registry.
//! Run with: cargo test --test integration

mod filter;
mod heartbeat;

use std::sync::Arc;

use vigil::discovery::{CandidateServer, Check, CheckStatus, InMemoryRegistry, Member, MemberStatus};
use vigil::health::ServiceCheckFilter;

pub const APP: &str = "orders";

/// Registry with the given nodes alive in the gossip pool
///
/// Each node carries a passing agent check, so its node health is green
/// until a test adds a worse system check.
pub fn registry_with_alive_nodes(nodes: &[&str]) -> Arc<InMemoryRegistry> {
    let registry = Arc::new(InMemoryRegistry::new());
    for (i, node) in nodes.iter().enumerate() {
        registry.put_member(Member::new(*node, format!("10.0.0.{}", i + 1), MemberStatus::Alive));
        registry.put_check(Check::node(*node, "serfHealth", CheckStatus::Passing));
    }
    registry
}

/// Filter backed by `registry` for both checks and liveness
pub fn filter_for(registry: &Arc<InMemoryRegistry>) -> ServiceCheckFilter {
    ServiceCheckFilter::new(registry.clone(), registry.clone())
}

/// Candidate of the test application
pub fn candidate(node: &str, instance_id: &str) -> CandidateServer {
    CandidateServer::new(node, instance_id, APP).with_endpoint(format!("{node}.local"), 8080)
}

/// Service check of the test application
pub fn instance_check(node: &str, instance_id: &str, status: CheckStatus) -> Check {
    Check::service(node, APP, instance_id, status)
}

pub fn instance_ids(servers: &[CandidateServer]) -> Vec<&str> {
    servers.iter().map(|s| s.instance_id.as_str()).collect()
}
