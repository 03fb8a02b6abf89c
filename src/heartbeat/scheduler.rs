//! TTL heartbeat scheduler
//!
//! A single background task ticks at a fixed rate. On each tick every
//! service whose last report is older than the heartbeat interval gets a
//! TTL check update derived from the local health indicator:
//!
//! | Application status | Check update |
//! |--------------------|--------------|
//! | `Up`               | pass         |
//! | `Unknown`          | warn         |
//! | anything else      | fail         |
//!
//! A failed update is logged and retried once the interval has elapsed
//! again; it never removes the service nor stops the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::HeartbeatConfig;
use crate::discovery::{CheckOutcome, HealthIndicator, RegistryClient};
use crate::metrics::metrics;

use super::registry::{HeartbeatRegistry, RegistrationError, ServiceRegistration};

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Services whose report was due
    pub due: usize,
    /// Reports accepted by the registry
    pub reported: usize,
    /// Reports that failed
    pub failed: usize,
    /// Services not due yet
    pub skipped: usize,
}

/// Periodically reports the health of registered services
pub struct HeartbeatScheduler {
    registry: Arc<HeartbeatRegistry>,
    client: Arc<dyn RegistryClient>,
    indicator: Arc<dyn HealthIndicator>,
    config: HeartbeatConfig,
}

impl HeartbeatScheduler {
    pub fn new(
        config: HeartbeatConfig,
        client: Arc<dyn RegistryClient>,
        indicator: Arc<dyn HealthIndicator>,
    ) -> Self {
        Self::with_registry(Arc::new(HeartbeatRegistry::new()), config, client, indicator)
    }

    /// Create from an existing registry
    pub fn with_registry(
        registry: Arc<HeartbeatRegistry>,
        config: HeartbeatConfig,
        client: Arc<dyn RegistryClient>,
        indicator: Arc<dyn HealthIndicator>,
    ) -> Self {
        Self {
            registry,
            client,
            indicator,
            config,
        }
    }

    /// Get the registry
    pub fn registry(&self) -> Arc<HeartbeatRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Start heartbeating a service; the next tick reports it
    pub fn add(&self, service_id: &str) -> Result<(), RegistrationError> {
        self.registry.add(service_id)?;
        metrics().set_heartbeat_services(self.registry.len());
        Ok(())
    }

    /// Stop heartbeating a service
    pub fn remove(&self, service_id: &str) -> Result<(), RegistrationError> {
        self.registry.remove(service_id)?;
        metrics().set_heartbeat_services(self.registry.len());
        Ok(())
    }

    /// Report every service that is due
    pub async fn tick(&self) -> TickSummary {
        let interval = self.config.heartbeat_interval();
        let mut summary = TickSummary::default();

        for record in self.registry.snapshot() {
            if !record.is_due(Instant::now(), interval) {
                summary.skipped += 1;
                continue;
            }

            summary.due += 1;
            if self.send_heartbeat(&record.registration).await {
                summary.reported += 1;
            } else {
                summary.failed += 1;
            }

            // Also on failure, so a broken registry is retried once per interval
            self.registry.mark_heartbeat(&record, Instant::now());
        }

        summary
    }

    /// Send one TTL check update, returns whether the registry accepted it
    async fn send_heartbeat(&self, registration: &ServiceRegistration) -> bool {
        let health = self.indicator.health();
        let outcome = CheckOutcome::for_status(&health.status);
        let note = health.note();

        match self
            .client
            .report_check(&registration.check_id, outcome, &note)
            .await
        {
            Ok(()) => {
                debug!(
                    service_id = %registration.service_id,
                    check_id = %registration.check_id,
                    outcome = %outcome,
                    "Sent heartbeat"
                );
                metrics().record_heartbeat(outcome.as_str(), true);
                true
            }
            Err(e) => {
                warn!(
                    service_id = %registration.service_id,
                    check_id = %registration.check_id,
                    outcome = %outcome,
                    error = %e,
                    "Failed to send heartbeat"
                );
                metrics().record_heartbeat(outcome.as_str(), false);
                false
            }
        }
    }

    /// Spawn the tick loop; it runs until `shutdown` is cancelled
    ///
    /// The first tick fires immediately.
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        if !self.config.enabled {
            info!("Heartbeats are disabled");
            return tokio::spawn(async move {
                shutdown.cancelled().await;
            });
        }

        let period = self.config.tick_interval().max(Duration::from_millis(1));
        info!(
            tick_interval_ms = period.as_millis() as u64,
            heartbeat_interval_ms = self.config.heartbeat_interval().as_millis() as u64,
            ttl = %self.config.ttl(),
            "Heartbeat scheduler started"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Heartbeat scheduler shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let summary = self.tick().await;
                        if summary.due > 0 {
                            debug!(
                                due = summary.due,
                                reported = summary.reported,
                                failed = summary.failed,
                                "Heartbeat tick"
                            );
                        }
                    }
                }
            }
        })
    }
}
