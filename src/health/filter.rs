//! Health-based server list filtering
//!
//! Ranks each candidate by the worse of its node health and its instance
//! health, then keeps only the best tier. Traffic goes to the healthiest
//! known instances and degraded ones are shed as soon as a better one exists.
//!
//! # Behavior
//! - Node health only counts system checks of nodes that are alive in the
//!   gossip pool
//! - A candidate whose node is not alive contributes no node checks, so with
//!   no instance checks either it ranks `NoCheckDefined`, not `Failed`
//! - If even the best candidate is `Failed`, nothing is returned

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::discovery::{CandidateServer, Check, DiscoveryResult, LivenessProvider, RegistryClient};
use crate::metrics::metrics;

use super::aggregator::{index_by_min_health, HealthIndex};
use super::level::{Bounded, HealthLevel};

/// A candidate together with its combined health level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedServer {
    pub server: CandidateServer,
    pub level: HealthLevel,
}

/// Stage of a load balancer that narrows down the server list
#[async_trait]
pub trait ServerListFilter: Send + Sync {
    async fn filter(&self, servers: Vec<CandidateServer>) -> DiscoveryResult<Vec<CandidateServer>>;
}

/// Filters servers using registry health checks and agent liveness
pub struct ServiceCheckFilter {
    client: Arc<dyn RegistryClient>,
    liveness: Arc<dyn LivenessProvider>,
    enabled: bool,
}

impl ServiceCheckFilter {
    pub fn new(client: Arc<dyn RegistryClient>, liveness: Arc<dyn LivenessProvider>) -> Self {
        Self {
            client,
            liveness,
            enabled: true,
        }
    }

    /// Create a filter honoring `config.enabled`
    pub fn with_config(
        config: &FilterConfig,
        client: Arc<dyn RegistryClient>,
        liveness: Arc<dyn LivenessProvider>,
    ) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(client, liveness)
        }
    }

    /// Keep the candidates in the best health tier
    ///
    /// Returns `Ok(vec![])` when no candidate is eligible. Any failure of the
    /// liveness lookup or of a check query fails the whole call.
    pub async fn select_healthy_servers(
        &self,
        candidates: Vec<CandidateServer>,
    ) -> DiscoveryResult<Vec<CandidateServer>> {
        if candidates.is_empty() || !self.enabled {
            metrics().record_filter_run("skipped");
            return Ok(candidates);
        }

        debug!(count = candidates.len(), "Filtering servers by health");
        metrics().observe_filter_candidates(candidates.len());

        let ranked = match self.rank(candidates).await {
            Ok(ranked) => ranked,
            Err(e) => {
                metrics().record_filter_run("error");
                return Err(e);
            }
        };

        let selected = select_top(ranked);
        if selected.is_empty() {
            metrics().record_filter_run("empty");
        } else {
            metrics().record_filter_run("selected");
        }
        debug!(selected = selected.len(), "Servers filtered by health");
        Ok(selected)
    }

    /// Combined health level of every candidate, in input order
    pub async fn rank(&self, candidates: Vec<CandidateServer>) -> DiscoveryResult<Vec<RankedServer>> {
        let Some(app_name) = candidates.first().map(|c| c.app_name.clone()) else {
            return Ok(Vec::new());
        };
        if candidates.iter().any(|c| c.app_name != app_name) {
            warn!(app = %app_name, "Candidates span several services, using instance checks of the first");
        }

        let nodes: BTreeSet<&str> = candidates.iter().map(|c| c.node.as_str()).collect();
        let (node_health, instance_health) = futures::try_join!(
            self.nodes_by_health(&nodes),
            self.instances_by_health(&app_name)
        )?;

        Ok(candidates
            .into_iter()
            .map(|server| {
                let instance = instance_health.level(&server.instance_id);
                let node = node_health.level(&server.node);
                debug!(
                    instance_id = %server.instance_id,
                    instance = %instance,
                    node = %node,
                    "Candidate health"
                );
                RankedServer {
                    level: instance.min(node),
                    server,
                }
            })
            .collect())
    }

    /// Minimum level of the system checks of each live node
    async fn nodes_by_health(&self, nodes: &BTreeSet<&str>) -> DiscoveryResult<HealthIndex> {
        let alive = self.liveness.alive_nodes().await?;
        let live: Vec<&str> = nodes
            .iter()
            .copied()
            .filter(|node| alive.contains(*node))
            .collect();
        if live.len() < nodes.len() {
            debug!(
                requested = nodes.len(),
                alive = live.len(),
                "Ignoring checks of nodes not alive in the gossip pool"
            );
        }

        let per_node = try_join_all(live.iter().map(|node| self.client.node_checks(node))).await?;
        let checks: Vec<Check> = per_node
            .into_iter()
            .flatten()
            .filter(Check::is_system)
            .collect();

        Ok(index_by_min_health(&checks, |c| c.node.as_str()))
    }

    /// Minimum level of the checks of each instance of a service
    ///
    /// Checks without a service id belong to no instance and are skipped.
    async fn instances_by_health(&self, app_name: &str) -> DiscoveryResult<HealthIndex> {
        let checks: Vec<Check> = self
            .client
            .service_checks(app_name)
            .await?
            .into_iter()
            .filter(|c| !c.is_system())
            .collect();
        Ok(index_by_min_health(&checks, |c| {
            c.service_id.as_deref().unwrap_or_default()
        }))
    }
}

#[async_trait]
impl ServerListFilter for ServiceCheckFilter {
    async fn filter(&self, servers: Vec<CandidateServer>) -> DiscoveryResult<Vec<CandidateServer>> {
        self.select_healthy_servers(servers).await
    }
}

/// Keep every server ranked at the best level, unless that level is `Failed`
pub fn select_top(ranked: Vec<RankedServer>) -> Vec<CandidateServer> {
    let best = ranked
        .iter()
        .fold(Bounded::MinusInfinity, |best, r| best.max(r.level.into()));

    match best.level() {
        Some(level) if level.is_eligible() => ranked
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.server)
            .collect(),
        _ => Vec::new(),
    }
}
