//! Contracts of the discovery registry collaborators
//!
//! The heartbeat scheduler and the service check filter only talk to the
//! outside world through these traits:
//! - `RegistryClient`: TTL check updates and health check queries
//! - `LivenessProvider`: gossip membership of the cluster agents
//! - `HealthIndicator`: current health of the local application
//!
//! Adapters own their timeouts and surface failures as `DiscoveryError`.

mod memory;
mod types;

pub use memory::{InMemoryRegistry, ReportedCheck};
pub use types::{
    CandidateServer, Check, CheckOutcome, CheckStatus, Health, Member, MemberStatus, Status,
};

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of an external discovery call
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Registry request failed: {0}")]
    Registry(String),
    #[error("Liveness lookup failed: {0}")]
    Liveness(String),
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),
}

impl DiscoveryError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, DiscoveryError::InvalidResponse(_))
    }
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Client of the discovery registry
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Update the TTL check `check_id` with the given outcome and note
    async fn report_check(
        &self,
        check_id: &str,
        outcome: CheckOutcome,
        note: &str,
    ) -> DiscoveryResult<()>;

    /// All checks registered on a node (system and service checks)
    async fn node_checks(&self, node: &str) -> DiscoveryResult<Vec<Check>>;

    /// All checks of every instance of a service
    async fn service_checks(&self, service_name: &str) -> DiscoveryResult<Vec<Check>>;
}

/// Gossip view of the cluster agents
#[async_trait]
pub trait LivenessProvider: Send + Sync {
    /// Every member of the gossip pool, whatever its status
    async fn members(&self) -> DiscoveryResult<Vec<Member>>;

    /// Names of the members currently alive
    async fn alive_nodes(&self) -> DiscoveryResult<HashSet<String>> {
        Ok(self
            .members()
            .await?
            .into_iter()
            .filter(Member::is_alive)
            .map(|m| m.name)
            .collect())
    }

    /// Addresses of the members currently alive
    async fn alive_addresses(&self) -> DiscoveryResult<HashSet<String>> {
        Ok(self
            .members()
            .await?
            .into_iter()
            .filter(Member::is_alive)
            .map(|m| m.address)
            .collect())
    }
}

/// Source of the local application's health
pub trait HealthIndicator: Send + Sync {
    fn health(&self) -> Health;
}

/// Indicator that always reports the same health
#[derive(Debug, Clone)]
pub struct StaticHealth(pub Health);

impl HealthIndicator for StaticHealth {
    fn health(&self) -> Health {
        self.0.clone()
    }
}

impl<F> HealthIndicator for F
where
    F: Fn() -> Health + Send + Sync,
{
    fn health(&self) -> Health {
        self()
    }
}
