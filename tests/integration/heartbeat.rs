//! TTL heartbeats reported to the in-memory registry

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vigil::config::HeartbeatConfig;
use vigil::discovery::{CheckOutcome, Health, InMemoryRegistry};
use vigil::heartbeat::HeartbeatScheduler;

fn config() -> HeartbeatConfig {
    HeartbeatConfig {
        enabled: true,
        tick_interval_ms: 1000,
        ttl_secs: 30, // 20s between reports
        ..HeartbeatConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_reports_track_application_health() {
    let registry = Arc::new(InMemoryRegistry::new());
    let up = Arc::new(AtomicBool::new(true));
    let indicator = {
        let up = up.clone();
        move || {
            if up.load(Ordering::SeqCst) {
                Health::up()
            } else {
                Health::down().with_detail("db", "unreachable")
            }
        }
    };

    let scheduler = Arc::new(HeartbeatScheduler::new(config(), registry.clone(), Arc::new(indicator)));
    scheduler.add("orders-1").unwrap();

    let shutdown = CancellationToken::new();
    let handle = scheduler.clone().start(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(500)).await;
    up.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(20)).await;

    let reports = registry.reports_for("service:orders-1");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].outcome, CheckOutcome::Pass);
    assert_eq!(reports[1].outcome, CheckOutcome::Fail);
    assert!(reports[1].note.contains("unreachable"));

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_services_added_later_report_on_next_tick() {
    let registry = Arc::new(InMemoryRegistry::new());
    let scheduler = Arc::new(HeartbeatScheduler::new(
        config(),
        registry.clone(),
        Arc::new(|| Health::up()),
    ));
    scheduler.add("orders-1").unwrap();

    let shutdown = CancellationToken::new();
    let handle = scheduler.clone().start(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.add("orders-2").unwrap();
    scheduler.remove("orders-1").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(registry.reports_for("service:orders-1").len(), 1);
    assert_eq!(registry.reports_for("service:orders-2").len(), 1);
    assert_eq!(scheduler.registry().service_ids(), vec!["orders-2".to_string()]);

    shutdown.cancel();
    handle.await.unwrap();
}
